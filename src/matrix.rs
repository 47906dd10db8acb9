//! The 8×8 RGB LED matrix.
//!
//! The matrix is exposed by the kernel as a framebuffer device holding 64 RGB565 cells, two bytes
//! per cell, little-endian. [`LedMatrix`] addresses it in logical coordinates: `(0, 0)` is the
//! top-left corner as seen by the caller regardless of how the HAT is mounted, and the configured
//! [`Rotation`] only changes which physical cell a logical coordinate maps to, never the colors a
//! caller reads back.
//!
//! The device is opened, used and released on every operation, so no descriptor is held across
//! calls and every exit path (success, validation failure or I/O failure) releases the handle.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use log::debug;
use snafu::{OptionExt, ResultExt, Snafu, ensure};

use crate::{
    color::{Rgb, Rgb565Ext},
    rotation::{OrientationMaps, Rotation},
};

/// Number of cells on the matrix.
pub const PIXEL_COUNT: usize = 64;

const OFF: Rgb<u8> = Rgb { r: 0, g: 0, b: 0 };

/// The Sense HAT's 8×8 LED matrix, addressed through its framebuffer device.
///
/// # Examples
///
/// ```no_run
/// use sensehat::{color::Rgb, matrix::LedMatrix};
///
/// let mut matrix = LedMatrix::new("/dev/fb1");
/// matrix.set_rotation(180)?;
/// matrix.set_pixel(0, 0, Rgb::new(255, 0, 0))?;
/// # Ok::<(), sensehat::matrix::MatrixError>(())
/// ```
#[derive(Debug)]
pub struct LedMatrix {
    path: PathBuf,
    rotation: Rotation,
    maps: OrientationMaps,
}

impl LedMatrix {
    /// Creates a matrix backed by the framebuffer device at `path`.
    ///
    /// No I/O happens here; the device is opened per operation. Use
    /// [`platform::find_framebuffer`](crate::platform::find_framebuffer) to discover the path on
    /// a real system.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            rotation: Rotation::default(),
            maps: OrientationMaps::new(),
        }
    }

    /// Returns the path of the backing framebuffer device.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the currently configured rotation.
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Sets the display rotation in degrees clockwise.
    ///
    /// Only 0, 90, 180 and 270 are supported; anything else fails with
    /// [`MatrixError::InvalidRotation`] and leaves the previous rotation in place, so addressing
    /// operations never observe an unsupported value.
    pub fn set_rotation(&mut self, degrees: i32) -> Result<(), MatrixError> {
        self.rotation = Rotation::from_degrees(degrees).context(InvalidRotationSnafu { degrees })?;
        Ok(())
    }

    /// Reads the color of the pixel at logical coordinates `(x, y)`.
    ///
    /// Both coordinates must be in `0..=7`. The color returned is the RGB565 expansion of what
    /// the framebuffer holds, so a value written with [`set_pixel`](Self::set_pixel) reads back
    /// quantized.
    pub fn pixel(&self, x: i32, y: i32) -> Result<Rgb<u8>, MatrixError> {
        let cell = self.cell_index(x, y)?;
        let mut file = self.open_device(false)?;
        self.read_cell(&mut file, cell)
    }

    /// Sets the pixel at logical coordinates `(x, y)`.
    ///
    /// Both coordinates must be in `0..=7`.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb<u8>) -> Result<(), MatrixError> {
        let cell = self.cell_index(x, y)?;
        let mut file = self.open_device(true)?;
        self.write_cell(&mut file, cell, color)
    }

    /// Writes a full frame of exactly [`PIXEL_COUNT`] pixels in logical row-major order.
    ///
    /// Fails with [`MatrixError::InvalidLength`] before touching the device if `pixels` is not
    /// exactly 64 entries. The frame write is not atomic: if a write fails partway through, the
    /// cells already written stay updated and the error for the failing cell is returned.
    pub fn set_pixels(&mut self, pixels: &[Rgb<u8>]) -> Result<(), MatrixError> {
        ensure!(
            pixels.len() == PIXEL_COUNT,
            InvalidLengthSnafu { len: pixels.len() }
        );

        let map = self.maps.get(self.rotation);
        let mut file = self.open_device(true)?;
        for (index, &color) in pixels.iter().enumerate() {
            self.write_cell(&mut file, map[index], color)?;
        }
        Ok(())
    }

    /// Reads the full frame in logical row-major order.
    pub fn pixels(&self) -> Result<[Rgb<u8>; PIXEL_COUNT], MatrixError> {
        let map = self.maps.get(self.rotation);
        let mut file = self.open_device(false)?;

        let mut frame = [OFF; PIXEL_COUNT];
        for (index, slot) in frame.iter_mut().enumerate() {
            *slot = self.read_cell(&mut file, map[index])?;
        }
        Ok(frame)
    }

    /// Fills every cell with one color.
    pub fn fill(&mut self, color: Rgb<u8>) -> Result<(), MatrixError> {
        debug!("filling matrix with {color}");
        self.set_pixels(&[color; PIXEL_COUNT])
    }

    /// Turns every LED off.
    pub fn clear(&mut self) -> Result<(), MatrixError> {
        self.fill(OFF)
    }

    /// Decodes an image file and samples its top-left 8×8 pixel block in row-major order,
    /// discarding any alpha channel.
    ///
    /// Images larger than 8×8 are cropped to the top-left block, never resized; pixels beyond the
    /// bounds of a smaller image read as black. When `redraw` is set, the sampled frame is also
    /// written to the matrix via [`set_pixels`](Self::set_pixels).
    pub fn load_image(
        &mut self,
        path: impl AsRef<Path>,
        redraw: bool,
    ) -> Result<[Rgb<u8>; PIXEL_COUNT], MatrixError> {
        let path = path.as_ref();
        ensure!(path.exists(), ImageNotFoundSnafu { path });

        let decoded = image::open(path).context(ImageDecodeSnafu { path })?;
        let rgba = decoded.to_rgba8();
        debug!(
            "sampling 8x8 block from {} ({}x{})",
            path.display(),
            rgba.width(),
            rgba.height()
        );

        let mut frame = [OFF; PIXEL_COUNT];
        for y in 0..8u32 {
            for x in 0..8u32 {
                if x < rgba.width() && y < rgba.height() {
                    let sample = rgba.get_pixel(x, y);
                    frame[(y * 8 + x) as usize] = Rgb::new(sample[0], sample[1], sample[2]);
                }
            }
        }

        if redraw {
            self.set_pixels(&frame)?;
        }
        Ok(frame)
    }

    /// Resolves logical coordinates to a physical cell index through the current rotation's map.
    fn cell_index(&self, x: i32, y: i32) -> Result<usize, MatrixError> {
        ensure!((0..8).contains(&x) && (0..8).contains(&y), OutOfRangeSnafu { x, y });
        Ok(self.maps.get(self.rotation)[(y * 8 + x) as usize])
    }

    fn open_device(&self, writable: bool) -> Result<File, MatrixError> {
        if writable {
            OpenOptions::new().write(true).open(&self.path)
        } else {
            File::open(&self.path)
        }
        .context(DeviceIoSnafu { path: &self.path })
    }

    fn read_cell(&self, file: &mut File, cell: usize) -> Result<Rgb<u8>, MatrixError> {
        file.seek(SeekFrom::Start((cell * 2) as u64))
            .context(DeviceIoSnafu { path: &self.path })?;

        let mut raw = [0u8; 2];
        file.read_exact(&mut raw)
            .context(DeviceIoSnafu { path: &self.path })?;
        Ok(Rgb::from_rgb565(u16::from_le_bytes(raw)))
    }

    fn write_cell(&self, file: &mut File, cell: usize, color: Rgb<u8>) -> Result<(), MatrixError> {
        file.seek(SeekFrom::Start((cell * 2) as u64))
            .context(DeviceIoSnafu { path: &self.path })?;
        file.write_all(&color.into_rgb565().to_le_bytes())
            .context(DeviceIoSnafu { path: &self.path })
    }
}

/// Errors that can occur when driving the LED matrix.
#[derive(Debug, Snafu)]
pub enum MatrixError {
    /// A pixel coordinate was outside the 8×8 grid.
    #[snafu(display("pixel coordinate ({x}, {y}) is outside the 8x8 matrix"))]
    OutOfRange {
        /// The x coordinate that was passed.
        x: i32,
        /// The y coordinate that was passed.
        y: i32,
    },

    /// A frame did not contain exactly 64 pixels.
    #[snafu(display("a frame must contain exactly 64 pixels, got {len}"))]
    InvalidLength {
        /// Length of the rejected pixel slice.
        len: usize,
    },

    /// A rotation outside {{0, 90, 180, 270}} was requested.
    #[snafu(display("{degrees} degrees is not a supported rotation (0, 90, 180 or 270)"))]
    InvalidRotation {
        /// The rejected angle.
        degrees: i32,
    },

    /// Opening, seeking, reading or writing the framebuffer device failed.
    #[snafu(display("framebuffer device I/O failed on {}", path.display()))]
    DeviceIo {
        /// Path of the framebuffer device.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The image path passed to [`LedMatrix::load_image`] does not exist.
    #[snafu(display("image file not found: {}", path.display()))]
    ImageNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The image file could not be decoded.
    #[snafu(display("failed to decode image {}", path.display()))]
    ImageDecode {
        /// Path of the unreadable image.
        path: PathBuf,
        /// The decoder's error.
        source: image::ImageError,
    },
}

#[cfg(test)]
mod test {
    use std::io::Write as _;

    use tempfile::NamedTempFile;

    use super::*;

    /// A scratch framebuffer: 64 zeroed RGB565 cells in a temp file.
    fn scratch_matrix() -> (NamedTempFile, LedMatrix) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; PIXEL_COUNT * 2]).unwrap();
        file.flush().unwrap();
        let matrix = LedMatrix::new(file.path());
        (file, matrix)
    }

    #[test]
    fn set_then_get_is_quantized_identity() {
        let (_file, mut matrix) = scratch_matrix();
        let color = Rgb::new(201, 87, 44);
        let expected = Rgb::from_rgb565(color.into_rgb565());

        for rotation in [0, 90, 180, 270] {
            matrix.set_rotation(rotation).unwrap();
            for y in 0..8 {
                for x in 0..8 {
                    matrix.set_pixel(x, y, color).unwrap();
                    assert_eq!(matrix.pixel(x, y).unwrap(), expected, "({x}, {y}) @ {rotation}");
                }
            }
        }
    }

    #[test]
    fn coordinates_are_validated_before_io() {
        // A nonexistent device: any attempt to touch it would fail with DeviceIo, so getting the
        // validation error proves no I/O was attempted.
        let mut matrix = LedMatrix::new("/nonexistent/fb9");

        assert!(matches!(
            matrix.pixel(-1, 0),
            Err(MatrixError::OutOfRange { x: -1, y: 0 })
        ));
        assert!(matches!(
            matrix.pixel(8, 0),
            Err(MatrixError::OutOfRange { x: 8, y: 0 })
        ));
        assert!(matches!(
            matrix.set_pixel(0, 8, Rgb::new(1, 2, 3)),
            Err(MatrixError::OutOfRange { x: 0, y: 8 })
        ));
        assert!(matches!(
            matrix.set_pixels(&[Rgb::new(0, 0, 0); 63]),
            Err(MatrixError::InvalidLength { len: 63 })
        ));
    }

    #[test]
    fn unsupported_rotation_is_rejected_at_assignment() {
        let (_file, mut matrix) = scratch_matrix();
        matrix.set_rotation(90).unwrap();

        assert!(matches!(
            matrix.set_rotation(45),
            Err(MatrixError::InvalidRotation { degrees: 45 })
        ));
        // The previous rotation stays configured and the matrix keeps working.
        assert_eq!(matrix.rotation(), Rotation::Deg90);
        matrix.set_pixel(3, 4, Rgb::new(10, 20, 30)).unwrap();
    }

    #[test]
    fn fill_replicates_across_all_cells() {
        let (_file, mut matrix) = scratch_matrix();
        let color = Rgb::new(0, 64, 128);
        matrix.fill(color).unwrap();

        let expected = Rgb::from_rgb565(color.into_rgb565());
        assert_eq!(matrix.pixels().unwrap(), [expected; PIXEL_COUNT]);

        matrix.clear().unwrap();
        assert_eq!(matrix.pixels().unwrap(), [Rgb::new(0, 0, 0); PIXEL_COUNT]);
    }

    #[test]
    fn load_image_samples_top_left_block() {
        let (_file, mut matrix) = scratch_matrix();

        // 16x16 source: the top-left 8x8 block is a red gradient, everything else green. Alpha
        // varies and must be discarded.
        let source = image::RgbaImage::from_fn(16, 16, |x, y| {
            if x < 8 && y < 8 {
                image::Rgba([(y * 8 + x) as u8 * 2, 0, 0, 128])
            } else {
                image::Rgba([0, 255, 0, 255])
            }
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        source.save(&path).unwrap();

        let frame = matrix.load_image(&path, true).unwrap();
        for (index, pixel) in frame.iter().enumerate() {
            assert_eq!(*pixel, Rgb::new(index as u8 * 2, 0, 0));
        }
        // redraw=true pushed the frame to the device (quantized on read-back).
        assert_eq!(
            matrix.pixel(7, 7).unwrap(),
            Rgb::from_rgb565(Rgb::new(126, 0, 0).into_rgb565())
        );
    }

    #[test]
    fn load_image_missing_path_is_distinguished() {
        let (_file, mut matrix) = scratch_matrix();
        assert!(matches!(
            matrix.load_image("/nonexistent/frame.png", false),
            Err(MatrixError::ImageNotFound { .. })
        ));
    }
}
