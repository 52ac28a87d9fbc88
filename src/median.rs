// median.rs — 3×3 order-statistic (median) despeckle.
//
// For every interior pixel, gather the nine neighborhood values of each
// channel, sort them, and keep the middle one (index 4). Channels are
// handled independently, so the output pixel need not appear anywhere in
// the neighborhood as a whole triple.
//
// Salt-and-pepper noise (isolated pixels far from their surroundings) is
// removed outright; edges survive because the median never averages across
// them.
//
// Same border contract as convolution.rs: only x ∈ [1, w−2], y ∈ [1, h−2]
// is written. Reads come exclusively from the source, writes go to a
// separate destination, one rayon task per row.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{ensure_same_size, Result};
use crate::image::{RasterBuffer, Rgb};

/// Median of the 3×3 neighborhood centered on (x, y), per channel.
///
/// # Panics
/// Panics if any neighbor of (x, y) lies outside `src`.
#[inline]
pub fn median_at(src: &RasterBuffer, x: usize, y: usize) -> Rgb {
    let mut r = [0u8; 9];
    let mut g = [0u8; 9];
    let mut b = [0u8; 9];
    let mut i = 0;
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            let c = src.at(nx, ny);
            r[i] = c.r;
            g[i] = c.g;
            b[i] = c.b;
            i += 1;
        }
    }
    Rgb::new(median9(&mut r), median9(&mut g), median9(&mut b))
}

#[inline]
fn median9(values: &mut [u8; 9]) -> u8 {
    *values.select_nth_unstable(4).1
}

/// Write the median of every interior neighborhood of `src` into `dst`.
///
/// `dst` must match `src` in size and should already hold a valid image
/// (typically a copy of `src`); its border is left as is.
#[instrument(skip_all, fields(width = src.width(), height = src.height()))]
pub fn despeckle_into(src: &RasterBuffer, dst: &mut RasterBuffer) -> Result<()> {
    ensure_same_size(src.dimensions(), dst.dimensions())?;
    let interior = despeckle_rows(src, dst);
    debug!(interior, "despeckle complete");
    Ok(())
}

/// Despeckle into a copy of `src`.
#[instrument(skip_all, fields(width = src.width(), height = src.height()))]
pub fn despeckle(src: &RasterBuffer) -> RasterBuffer {
    let mut dst = src.clone();
    let interior = despeckle_rows(src, &mut dst);
    debug!(interior, "despeckle complete");
    dst
}

// `dst` must already match `src` in size. Returns the interior pixel count.
fn despeckle_rows(src: &RasterBuffer, dst: &mut RasterBuffer) -> usize {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w < 3 || h < 3 {
        return 0;
    }

    dst.par_rows_mut()
        .filter(|(y, _)| *y >= 1 && *y < h - 1)
        .for_each(|(y, row)| {
            for x in 1..w - 1 {
                row[x] = median_at(src, x, y);
            }
        });
    (w - 2) * (h - 2)
}
