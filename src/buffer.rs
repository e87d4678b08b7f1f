//! Raw raster data model shared by all fill algorithms.
//!
//! A [`PixelBuffer`] is an exclusively-owned, row-major RGBA byte buffer.
//! Buffers are large, so the whole engine moves them by value — handing a
//! buffer to the engine invalidates the caller's handle, and the result
//! buffer hands ownership back.  Nothing in this crate copies a full-size
//! buffer behind the caller's back.

use image::{Rgba, RgbaImage};

// ============================================================================
// POINT & BOUNDING BOX
// ============================================================================

/// A pixel coordinate.  Signed so that neighbour arithmetic at the image
/// border can go negative; always bounds-checked before indexing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive extent of the pixels actually modified by one fill pass.
/// Grows monotonically — `expand` never shrinks it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    /// A single-pixel box at the seed — the starting extent of every fill.
    pub fn seeded(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn expand(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Width in pixels (bounds are inclusive).
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height in pixels (bounds are inclusive).
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Declared dimensions do not match the channel-vector length.
///
/// This is a fatal precondition violation: the engine refuses the buffer
/// outright instead of ever reading past the end of the vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferShapeError {
    pub width: u32,
    pub height: u32,
    pub actual_len: usize,
}

impl std::fmt::Display for BufferShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "buffer shape mismatch: {}×{} RGBA needs {} bytes, got {}",
            self.width,
            self.height,
            self.width as usize * self.height as usize * 4,
            self.actual_len
        )
    }
}

impl std::error::Error for BufferShapeError {}

// ============================================================================
// PIXEL BUFFER
// ============================================================================

/// Row-major RGBA raster, 4 bytes per pixel.
/// Invariant: `data.len() == width * height * 4`, checked at construction.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A zeroed (fully transparent black) buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Adopt an existing channel vector, validating the shape invariant.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferShapeError> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(BufferShapeError {
                width,
                height,
                actual_len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Import from a flat `RgbaImage` (takes ownership of its storage).
    pub fn from_rgba_image(src: RgbaImage) -> Self {
        let (width, height) = src.dimensions();
        Self {
            width,
            height,
            data: src.into_raw(),
        }
    }

    /// Export as an `RgbaImage`, consuming the buffer.
    pub fn into_rgba_image(self) -> RgbaImage {
        // Shape invariant guarantees from_raw succeeds
        RgbaImage::from_raw(self.width, self.height, self.data)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Recover the channel vector, consuming the buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// True when the point lies inside the raster.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as u32) < self.width && (p.y as u32) < self.height
    }

    /// Channel index of pixel (x, y).  Callers bounds-check first.
    #[inline]
    pub fn index_of(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let i = self.index_of(x, y);
        Rgba([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, px: Rgba<u8>) {
        let i = self.index_of(x, y);
        self.data[i..i + 4].copy_from_slice(&px.0);
    }

    #[inline]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.data[self.index_of(x, y) + 3]
    }
}
