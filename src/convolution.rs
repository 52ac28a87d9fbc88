// convolution.rs — 3×3 kernel convolution over RGB buffers.
//
// Two use cases share this loop:
//   smooth  — all-ones kernel ÷ 9. Always in range.
//   sharpen — center +9, neighbors −1, ÷ 1. Routinely leaves [0, 255].
//
// ARITHMETIC:
//   Per channel, sum = Σ w·v in i64, then sum / divisor with Rust integer
//   division (truncates toward zero). The result then goes through the
//   overflow policy:
//     Clamp — saturate to [0, 255] (default).
//     Skip  — leave the destination pixel untouched unless every channel
//             satisfies 0 < v < 256. This is the legacy behavior and only
//             exists for bit-exact comparison against it.
//
// BORDER HANDLING: none. Only interior pixels x ∈ [1, w−2], y ∈ [1, h−2]
// are written; the destination's border keeps whatever it held. The
// `convolve` wrapper seeds the destination with a copy of the source.
//
// The source is only read and the destination only written, so rows are
// processed in parallel with rayon.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{ensure_same_size, RasterError, Result};
use crate::image::{RasterBuffer, Rgb};
use crate::kernel::Kernel;

/// What to do with a channel sum that falls outside [0, 255].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    #[default]
    Clamp,
    Skip,
}

/// Narrow a computed channel value to u8, reporting `InvalidChannelValue`
/// when it does not fit.
#[inline]
pub fn checked_channel(v: i64) -> Result<u8> {
    u8::try_from(v).map_err(|_| RasterError::InvalidChannelValue { value: v })
}

/// Raw per-channel kernel response at (x, y), already divided.
///
/// Accumulates in i64, which holds nine full-range i32 weights times 255.
///
/// # Panics
/// Panics if any neighbor of (x, y) lies outside `src`.
#[inline]
pub fn response_at(src: &RasterBuffer, kernel: &Kernel, x: usize, y: usize) -> [i64; 3] {
    let mut acc = [0i64; 3];
    for (ky, row) in kernel.weights().iter().enumerate() {
        for (kx, &w) in row.iter().enumerate() {
            if w == 0 {
                continue;
            }
            let w = w as i64;
            let c = src.at(x + kx - 1, y + ky - 1);
            acc[0] += w * c.r as i64;
            acc[1] += w * c.g as i64;
            acc[2] += w * c.b as i64;
        }
    }
    let d = kernel.divisor() as i64;
    [acc[0] / d, acc[1] / d, acc[2] / d]
}

/// Turn a raw response into a pixel according to `policy`.
/// `None` means "leave the destination pixel as it is".
#[inline]
pub fn resolve(raw: [i64; 3], policy: OverflowPolicy) -> Option<Rgb> {
    match policy {
        OverflowPolicy::Clamp => {
            let ch = raw.map(|v| match checked_channel(v) {
                Ok(c) => c,
                // Out of range is recovered, never surfaced.
                Err(_) => v.clamp(0, 255) as u8,
            });
            Some(Rgb::from_channels(ch))
        }
        OverflowPolicy::Skip => {
            if raw.iter().all(|&v| v > 0 && v < 256) {
                Some(Rgb::new(raw[0] as u8, raw[1] as u8, raw[2] as u8))
            } else {
                None
            }
        }
    }
}

/// Convolve every interior pixel of `src` into `dst`.
///
/// `dst` must have the same dimensions as `src`; its border pixels are not
/// touched. Returns the number of interior pixels left unwritten by
/// `OverflowPolicy::Skip` (always 0 under `Clamp`).
#[instrument(skip_all, fields(width = src.width(), height = src.height(), policy = ?policy))]
pub fn convolve_into(
    src: &RasterBuffer,
    dst: &mut RasterBuffer,
    kernel: &Kernel,
    policy: OverflowPolicy,
) -> Result<usize> {
    ensure_same_size(src.dimensions(), dst.dimensions())?;
    let skipped = convolve_rows(src, dst, kernel, policy);
    debug!(skipped, "convolution complete");
    Ok(skipped)
}

// `dst` must already match `src` in size.
fn convolve_rows(
    src: &RasterBuffer,
    dst: &mut RasterBuffer,
    kernel: &Kernel,
    policy: OverflowPolicy,
) -> usize {
    let w = src.width() as usize;
    let h = src.height() as usize;
    if w < 3 || h < 3 {
        return 0;
    }

    dst.par_rows_mut()
        .filter(|(y, _)| *y >= 1 && *y < h - 1)
        .map(|(y, row)| {
            let mut skipped = 0;
            for x in 1..w - 1 {
                match resolve(response_at(src, kernel, x, y), policy) {
                    Some(px) => row[x] = px,
                    None => skipped += 1,
                }
            }
            skipped
        })
        .sum()
}

/// Convolve into a fresh buffer seeded with a copy of `src`, so border
/// pixels (and any skipped pixels) keep their source values.
#[instrument(skip_all, fields(width = src.width(), height = src.height(), policy = ?policy))]
pub fn convolve(src: &RasterBuffer, kernel: &Kernel, policy: OverflowPolicy) -> RasterBuffer {
    let mut dst = src.clone();
    let skipped = convolve_rows(src, &mut dst, kernel, policy);
    debug!(skipped, "convolution complete");
    dst
}

/// 3×3 box blur with truncating division.
pub fn smooth(src: &RasterBuffer) -> RasterBuffer {
    convolve(src, &Kernel::smooth(), OverflowPolicy::Clamp)
}

/// 3×3 sharpen, clamped to [0, 255].
pub fn sharpen(src: &RasterBuffer) -> RasterBuffer {
    convolve(src, &Kernel::sharpen(), OverflowPolicy::Clamp)
}
