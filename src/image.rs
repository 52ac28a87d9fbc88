// image.rs — RGB raster buffer, the substrate every operator reads and writes.
//
// LAYOUT:
//   Row-major, dense, no stride padding. Pixel (x, y) lives at index
//   y * width + x; (0, 0) is the top-left corner.
//
//   data index:  0  1  2  3  4  5  6  7  8  9 10 11
//   pixel:       ■  ■  ■  ■  ■  ■  ■  ■  ■  ■  ■  ■
//   row:         |-- row 0 --|  |-- row 1 --|  |-- row 2 --|   (width = 4)
//
// OWNERSHIP:
//   A RasterBuffer is owned by exactly one caller at a time. Operators that
//   produce a new image allocate a fresh buffer; none of them keeps a
//   reference to its inputs after returning.
//
// ACCESS:
//   get()/set()        — fallible, report OutOfBounds. This is the contract
//                        exposed to image collaborators.
//   buf[(x, y)]        — panicking Index/IndexMut, for loops whose bounds are
//                        already validated.
//   par_rows_mut()     — crate-internal row split for rayon; each row of a
//                        destination is handed to exactly one task.

use std::fmt;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// One 8-bit-per-channel RGB sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Same value on all three channels.
    #[inline]
    pub const fn gray(v: u8) -> Self {
        Rgb { r: v, g: v, b: v }
    }

    #[inline]
    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    #[inline]
    pub fn from_channels([r, g, b]: [u8; 3]) -> Self {
        Rgb { r, g, b }
    }

    #[inline]
    pub fn channel(self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.r,
            Channel::Green => self.g,
            Channel::Blue => self.b,
        }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Rgb::from_channels(c)
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        c.channels()
    }
}

/// Channel selector, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// RasterBuffer
// ---------------------------------------------------------------------------

/// A width × height grid of RGB triples.
///
/// Every in-range coordinate holds a defined value; a fresh buffer is black.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    /// Pixel data in row-major order. Length = width * height.
    data: Vec<Rgb>,
    width: u32,
    height: u32,
}

impl RasterBuffer {
    // --- Constructors ---

    /// Create a black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgb::BLACK)
    }

    /// Create a buffer where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        RasterBuffer {
            data: vec![color; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Wrap an existing row-major pixel vector.
    ///
    /// Fails with `DegenerateInput` if `data.len() != width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<Rgb>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(RasterError::DegenerateInput(format!(
                "pixel vector holds {} samples, {width}x{height} needs {expected}",
                data.len()
            )));
        }
        Ok(RasterBuffer { data, width, height })
    }

    /// Build a buffer by evaluating `f(x, y)` at every coordinate.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        RasterBuffer { data, width, height }
    }

    // --- Accessors ---

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether a signed coordinate falls inside the buffer.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Read the pixel at column `x`, row `y`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Result<Rgb> {
        self.check(x, y)?;
        Ok(self.data[self.offset(x, y)])
    }

    /// Overwrite the pixel at column `x`, row `y`.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Rgb) -> Result<()> {
        self.check(x, y)?;
        let idx = self.offset(x, y);
        self.data[idx] = color;
        Ok(())
    }

    /// Borrow row `y`.
    ///
    /// # Panics
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[Rgb] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Mutable borrow of row `y`.
    ///
    /// # Panics
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [Rgb] {
        assert!(y < self.height, "row {y} out of bounds (height {})", self.height);
        let start = y as usize * self.width as usize;
        let end = start + self.width as usize;
        &mut self.data[start..end]
    }

    /// Iterate over all pixels as `(x, y, color)`, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, Rgb)> + '_ {
        let w = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &c)| ((i as u32) % w, (i as u32) / w, c))
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Rgb] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Rgb> {
        self.data
    }

    /// Apply `f` to every pixel, producing a new buffer of the same size.
    /// Pixels are processed in parallel.
    pub fn map(&self, f: impl Fn(Rgb) -> Rgb + Sync + Send) -> RasterBuffer {
        let data = self.data.par_iter().map(|&c| f(c)).collect();
        RasterBuffer {
            data,
            width: self.width,
            height: self.height,
        }
    }

    // --- Crate-internal helpers ---

    /// Wrap operator output whose length is correct by construction.
    pub(crate) fn from_raw(width: u32, height: u32, data: Vec<Rgb>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        RasterBuffer { data, width, height }
    }

    /// Rows of this buffer as disjoint mutable slices, in parallel.
    pub(crate) fn par_rows_mut(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = (usize, &mut [Rgb])> + '_ {
        let w = (self.width as usize).max(1);
        self.data.par_chunks_mut(w).enumerate()
    }

    /// Panicking read used by operator inner loops after the loop bounds
    /// have been validated.
    #[inline(always)]
    pub(crate) fn at(&self, x: usize, y: usize) -> Rgb {
        debug_assert!(x < self.width as usize && y < self.height as usize);
        self.data[y * self.width as usize + x]
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    fn check(&self, x: u32, y: u32) -> Result<()> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(RasterError::OutOfBounds {
                x: x as i64,
                y: y as i64,
                width: self.width,
                height: self.height,
            })
        }
    }
}

// Debug formatting — prints the top-left corner only, enough for test failures.
impl fmt::Debug for RasterBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RasterBuffer {{ {}×{} }}", self.width, self.height)?;
        for y in 0..self.height.min(8) {
            write!(f, "  row {y}: [")?;
            for x in 0..self.width.min(8) {
                if x > 0 {
                    write!(f, ", ")?;
                }
                let c = self.data[self.offset(x, y)];
                write!(f, "({},{},{})", c.r, c.g, c.b)?;
            }
            if self.width > 8 {
                write!(f, ", ...")?;
            }
            writeln!(f, "]")?;
        }
        if self.height > 8 {
            writeln!(f, "  ...")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Index / IndexMut — buf[(x, y)] syntax
// ---------------------------------------------------------------------------

impl std::ops::Index<(u32, u32)> for RasterBuffer {
    type Output = Rgb;

    #[inline]
    fn index(&self, (x, y): (u32, u32)) -> &Rgb {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for buffer {}×{}",
            self.width,
            self.height,
        );
        &self.data[self.offset(x, y)]
    }
}

impl std::ops::IndexMut<(u32, u32)> for RasterBuffer {
    #[inline]
    fn index_mut(&mut self, (x, y): (u32, u32)) -> &mut Rgb {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x},{y}) out of bounds for buffer {}×{}",
            self.width,
            self.height,
        );
        let idx = self.offset(x, y);
        &mut self.data[idx]
    }
}
