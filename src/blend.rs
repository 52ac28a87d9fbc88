// blend.rs — Linear cross-fade between two equally sized buffers.
//
//   out = round(alpha · a + (1 − alpha) · b)     per channel, in f64
//
// alpha = 1 reproduces `a`, alpha = 0 reproduces `b`. The blender is
// stateless; an animation is just a sequence of calls with increasing
// alpha, which `CrossFade` packages as an iterator. Frame pacing belongs to
// whoever consumes the frames.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{ensure_same_size, RasterError, Result};
use crate::image::{RasterBuffer, Rgb};

#[inline]
fn mix(c1: u8, c2: u8, alpha: f64) -> u8 {
    (alpha * c1 as f64 + (1.0 - alpha) * c2 as f64)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[inline]
fn mix_rgb(p: Rgb, q: Rgb, alpha: f64) -> Rgb {
    Rgb::new(mix(p.r, q.r, alpha), mix(p.g, q.g, alpha), mix(p.b, q.b, alpha))
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha.is_finite() && (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(RasterError::DegenerateInput(format!(
            "blend weight {alpha} outside [0, 1]"
        )))
    }
}

// Callers have already checked sizes and alpha.
fn blend_checked(a: &RasterBuffer, b: &RasterBuffer, alpha: f64) -> RasterBuffer {
    let data: Vec<Rgb> = a
        .as_slice()
        .par_iter()
        .zip(b.as_slice().par_iter())
        .map(|(&p, &q)| mix_rgb(p, q, alpha))
        .collect();
    RasterBuffer::from_raw(a.width(), a.height(), data)
}

/// Blend `a` over `b` with weight `alpha` ∈ [0, 1].
///
/// Fails with `DimensionMismatch` when the buffers differ in size and with
/// `DegenerateInput` when `alpha` is NaN, infinite or outside [0, 1].
#[instrument(skip_all, fields(width = a.width(), height = a.height(), alpha = alpha))]
pub fn cross_fade(a: &RasterBuffer, b: &RasterBuffer, alpha: f64) -> Result<RasterBuffer> {
    ensure_same_size(a.dimensions(), b.dimensions())?;
    check_alpha(alpha)?;
    let out = blend_checked(a, b, alpha);
    debug!(pixels = out.pixel_count(), "cross-fade frame ready");
    Ok(out)
}

/// The `frames + 1` buffers of a fade from `b` to `a`, with
/// alpha = k / frames for k = 0 ..= frames.
#[derive(Debug)]
pub struct CrossFade<'a> {
    a: &'a RasterBuffer,
    b: &'a RasterBuffer,
    frames: u32,
    next: u64,
}

impl<'a> CrossFade<'a> {
    /// Fails with `DimensionMismatch` for buffers of different sizes and
    /// with `DegenerateInput` when `frames == 0`.
    pub fn new(a: &'a RasterBuffer, b: &'a RasterBuffer, frames: u32) -> Result<Self> {
        ensure_same_size(a.dimensions(), b.dimensions())?;
        if frames == 0 {
            return Err(RasterError::DegenerateInput(
                "a cross-fade needs at least one frame step".to_string(),
            ));
        }
        Ok(CrossFade { a, b, frames, next: 0 })
    }

    /// Weight used for frame `k`.
    pub fn alpha(&self, k: u32) -> f64 {
        k as f64 / self.frames as f64
    }
}

impl Iterator for CrossFade<'_> {
    type Item = RasterBuffer;

    fn next(&mut self) -> Option<RasterBuffer> {
        if self.next > self.frames as u64 {
            return None;
        }
        let alpha = self.next as f64 / self.frames as f64;
        self.next += 1;
        Some(blend_checked(self.a, self.b, alpha))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.frames as u64 + 1).saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for CrossFade<'_> {}
