// gradient.rs — Sobel gradient magnitude and binary edge map.
//
// Works on the red channel of a buffer that has already been through
// convert::grayscale (so red == green == blue). At pixel (x, y), with
// R(i, j) the red value:
//
//   Gx = R(x−1,y−1) − R(x−1,y+1) + 2R(x,y−1) − 2R(x,y+1) + R(x+1,y−1) − R(x+1,y+1)
//   Gy = R(x−1,y−1) + 2R(x−1,y) + R(x−1,y+1) − R(x+1,y−1) − 2R(x+1,y) − R(x+1,y+1)
//   G  = ⌊√(Gx² + Gy²)⌋
//
// G ≤ threshold → black, otherwise white.
//
// PROCESSED RANGE: x ∈ [1, w−3], y ∈ [1, h−3], i.e. `x < w − 2` and
// `y < h − 2`. The right and bottom margins are two pixels wide, the left
// and top margins one. Everything outside the range keeps the value the
// destination already had.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::convert::grayscale;
use crate::error::{ensure_same_size, Result};
use crate::image::{RasterBuffer, Rgb};

/// Edge detector configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Gradient magnitudes at or below this value are background.
    pub threshold: u32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        EdgeConfig { threshold: 150 }
    }
}

/// Sobel responses (Gx, Gy) of the red channel at (x, y).
///
/// # Panics
/// Panics if any neighbor of (x, y) lies outside `src`.
#[inline]
pub fn sobel_at(src: &RasterBuffer, x: usize, y: usize) -> (i32, i32) {
    let r = |i: usize, j: usize| src.at(i, j).r as i32;
    let gx = r(x - 1, y - 1) - r(x - 1, y + 1) + 2 * r(x, y - 1) - 2 * r(x, y + 1)
        + r(x + 1, y - 1)
        - r(x + 1, y + 1);
    let gy = r(x - 1, y - 1) + 2 * r(x - 1, y) + r(x - 1, y + 1)
        - r(x + 1, y - 1)
        - 2 * r(x + 1, y)
        - r(x + 1, y + 1);
    (gx, gy)
}

/// ⌊√(gx² + gy²)⌋, computed exactly.
#[inline]
pub fn magnitude(gx: i32, gy: i32) -> u32 {
    let sq = (gx as i64 * gx as i64 + gy as i64 * gy as i64) as u64;
    let mut root = (sq as f64).sqrt() as u64;
    // Correct any off-by-one from the float estimate.
    while root * root > sq {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= sq {
        root += 1;
    }
    root as u32
}

/// Columns (or rows) visited for an extent of `n`: 1 .. n−2.
#[inline]
fn processed(n: usize) -> std::ops::Range<usize> {
    1..n.saturating_sub(2).max(1)
}

/// Threshold the gradient magnitude of `gray` into `dst`.
///
/// `dst` must match `gray` in size and already hold a valid image; only the
/// processed range is overwritten. Returns the number of edge (white)
/// pixels written.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height(), threshold = config.threshold))]
pub fn detect_edges_into(
    gray: &RasterBuffer,
    dst: &mut RasterBuffer,
    config: &EdgeConfig,
) -> Result<usize> {
    ensure_same_size(gray.dimensions(), dst.dimensions())?;
    let edges = threshold_rows(gray, dst, config.threshold);
    debug!(edges, "edge map complete");
    Ok(edges)
}

/// Edge map of an already-grayscaled buffer, written over a copy of it.
#[instrument(skip_all, fields(width = gray.width(), height = gray.height(), threshold = config.threshold))]
pub fn detect_edges(gray: &RasterBuffer, config: &EdgeConfig) -> RasterBuffer {
    let mut dst = gray.clone();
    let edges = threshold_rows(gray, &mut dst, config.threshold);
    debug!(edges, "edge map complete");
    dst
}

// `dst` must already match `gray` in size. Returns the white pixel count.
fn threshold_rows(gray: &RasterBuffer, dst: &mut RasterBuffer, threshold: u32) -> usize {
    let xs = processed(gray.width() as usize);
    let ys = processed(gray.height() as usize);

    dst.par_rows_mut()
        .filter(|(y, _)| ys.contains(y))
        .map(|(y, row)| {
            let mut count = 0;
            for x in xs.clone() {
                let (gx, gy) = sobel_at(gray, x, y);
                row[x] = if magnitude(gx, gy) <= threshold {
                    Rgb::BLACK
                } else {
                    count += 1;
                    Rgb::WHITE
                };
            }
            count
        })
        .sum()
}

/// Grayscale pass followed by the edge map, for color input.
pub fn edges_from_color(src: &RasterBuffer, config: &EdgeConfig) -> RasterBuffer {
    detect_edges(&grayscale(src), config)
}
