//! Embedded-graphics driver for the LED matrix.

use embedded_graphics_core::{pixelcolor::Rgb888, prelude::*, primitives::Rectangle};

use crate::{
    color::Rgb,
    matrix::{LedMatrix, MatrixError, PIXEL_COUNT},
};

/// An embedded-graphics draw target for the LED matrix.
///
/// Drawing accumulates into a backing frame and every draw call flushes the whole frame to the
/// device, so partially drawn shapes are never visible between calls.
pub struct MatrixDisplay {
    matrix: LedMatrix,
    frame: [Rgb<u8>; PIXEL_COUNT],
}

impl MatrixDisplay {
    /// Wraps a matrix in a draw target with an all-off backing frame.
    ///
    /// The matrix must be moved into this struct; it is written on every draw call.
    #[must_use]
    pub fn new(matrix: LedMatrix) -> Self {
        Self {
            matrix,
            frame: [Rgb { r: 0, g: 0, b: 0 }; PIXEL_COUNT],
        }
    }

    /// Releases the underlying matrix.
    #[must_use]
    pub fn into_inner(self) -> LedMatrix {
        self.matrix
    }
}

impl Dimensions for MatrixDisplay {
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(Point::zero(), Size::new(8, 8))
    }
}

impl DrawTarget for MatrixDisplay {
    type Color = Rgb888;

    type Error = MatrixError;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if (0..8).contains(&point.x) && (0..8).contains(&point.y) {
                self.frame[(point.y * 8 + point.x) as usize] =
                    Rgb::new(color.r(), color.g(), color.b());
            }
        }

        self.matrix.set_pixels(&self.frame)
    }
}
