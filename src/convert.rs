// convert.rs — Color → gray reduction.
//
// The edge detector reads the red channel of an already-grayscaled buffer,
// so the reduction is its own pass over every pixel, borders included:
//
//   gray = (r + g + b) / 3      (integer division, truncating)
//
// The result is written to all three channels.

use tracing::{debug, instrument};

use crate::image::{RasterBuffer, Rgb};

/// Gray level of a single pixel: the truncated mean of its channels.
#[inline]
pub fn luminance(c: Rgb) -> u8 {
    // Max sum is 765, so the mean always fits back into u8.
    ((c.r as u16 + c.g as u16 + c.b as u16) / 3) as u8
}

/// Produce a new buffer whose every pixel is `Rgb::gray(luminance(src))`.
#[instrument(skip_all, fields(width = src.width(), height = src.height()))]
pub fn grayscale(src: &RasterBuffer) -> RasterBuffer {
    let out = src.map(|c| Rgb::gray(luminance(c)));
    debug!(pixels = out.pixel_count(), "grayscale pass complete");
    out
}

/// In-place variant for callers that own the only copy.
pub fn grayscale_in_place(buf: &mut RasterBuffer) {
    for px in buf.as_mut_slice() {
        *px = Rgb::gray(luminance(*px));
    }
}
