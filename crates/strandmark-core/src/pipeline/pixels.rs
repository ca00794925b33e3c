//! Owned RGB pixel buffer shared read-only by both extractors.

use image::{DynamicImage, Rgb, RgbImage};
use thiserror::Error;

/// A decoded image as a row-major grid of RGB triples.
///
/// Alpha is discarded on conversion; extractors only ever read color.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    image: RgbImage,
}

/// A read outside the buffer's bounds.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pixel ({x}, {y}) outside {width}x{height} buffer")]
pub struct OutOfBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBuffer {
    /// Wrap an existing RGB image.
    pub fn from_rgb(image: RgbImage) -> Self {
        Self { image }
    }

    /// Convert any decoded image to RGB8.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.into_rgb8(),
        }
    }

    /// Build a buffer from a per-pixel function.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 3]) -> Self {
        Self {
            image: RgbImage::from_fn(width, height, |x, y| Rgb(f(x, y))),
        }
    }

    /// A buffer of a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_fn(width, height, |_, _| rgb)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Read one pixel, or `None` outside the buffer.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Read one pixel, reporting the coordinate on failure.
    pub fn try_get(&self, x: u32, y: u32) -> Result<[u8; 3], OutOfBounds> {
        self.get(x, y).ok_or(OutOfBounds {
            x,
            y,
            width: self.width(),
            height: self.height(),
        })
    }
}
