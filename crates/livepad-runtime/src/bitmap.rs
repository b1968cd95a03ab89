//! Raw image values.
//!
//! A [`Bitmap`] is the one value kind the dumper treats specially: instead
//! of field enumeration it is JPEG-encoded and shipped as a single node.

use std::borrow::Cow;

use crate::reflect::{Reflect, Shape};

/// An owned RGB8 pixel buffer, row-major, no padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum BitmapError {
    #[error("pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGB8")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("bitmap dimensions must be non-zero")]
    EmptyDimensions,
}

impl Bitmap {
    /// Wrap an RGB8 buffer. The buffer length must be exactly
    /// `width * height * 3`.
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BitmapError> {
        if width == 0 || height == 0 {
            return Err(BitmapError::EmptyDimensions);
        }
        let expected = width as usize * height as usize * 3;
        if pixels.len() != expected {
            return Err(BitmapError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A solid-color bitmap. Handy for placeholders and tests.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self, BitmapError> {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
        for _ in 0..(width as usize * height as usize) {
            pixels.extend_from_slice(&rgb);
        }
        Self::from_rgb8(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Reflect for Bitmap {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Bitmap")
    }
    fn shape(&self) -> Shape<'_> {
        Shape::Bitmap(self)
    }
}
