//! End-to-end frame scenarios against a scratch framebuffer device.

use std::{fs, io::Write};

use sensehat::{
    color::{Rgb, Rgb565Ext},
    matrix::{LedMatrix, PIXEL_COUNT},
};
use tempfile::NamedTempFile;

fn scratch_device() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0u8; PIXEL_COUNT * 2]).unwrap();
    file.flush().unwrap();
    file
}

/// Logical index `i` gets color `(i, 0, 0)`.
fn red_gradient() -> Vec<Rgb<u8>> {
    (0..PIXEL_COUNT).map(|i| Rgb::new(i as u8, 0, 0)).collect()
}

fn quantized(color: Rgb<u8>) -> Rgb<u8> {
    Rgb::from_rgb565(color.into_rgb565())
}

#[test]
fn rotation_changes_addressing_but_not_logical_colors() {
    let device = scratch_device();
    let mut matrix = LedMatrix::new(device.path());
    let frame = red_gradient();

    matrix.set_pixels(&frame).unwrap();
    let bytes_at_0 = fs::read(device.path()).unwrap();

    let read_back = matrix.pixels().unwrap();
    for (index, color) in read_back.iter().enumerate() {
        assert_eq!(*color, quantized(frame[index]), "logical index {index} at 0 degrees");
    }

    matrix.set_rotation(180).unwrap();
    matrix.set_pixels(&frame).unwrap();
    let bytes_at_180 = fs::read(device.path()).unwrap();

    // Same logical frame, by bulk read and by single-pixel read...
    let read_back = matrix.pixels().unwrap();
    for (index, color) in read_back.iter().enumerate() {
        assert_eq!(*color, quantized(frame[index]), "logical index {index} at 180 degrees");
    }
    for y in 0..8 {
        for x in 0..8 {
            let expected = quantized(frame[(y * 8 + x) as usize]);
            assert_eq!(matrix.pixel(x, y).unwrap(), expected, "({x}, {y}) at 180 degrees");
        }
    }

    // ...but a different physical byte layout: rotation affects addressing only.
    assert_ne!(bytes_at_0, bytes_at_180);
}
