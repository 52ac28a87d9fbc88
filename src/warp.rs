// warp.rs — Horizontal piecewise-linear remap.
//
// Every destination pixel (x, y) samples the source at (i, y), where the
// source column i is a three-segment piecewise-linear function of x:
//
//   x <  b0        → segment 0
//   b0 <= x < b1   → segment 1
//   x >= b1        → segment 2
//
// Each segment computes i = base + (x − origin) · num / den with integer
// division (truncation toward zero). The defaults reproduce a stretch of
// the first 100 columns, a compression up to column 400 and a plain shift
// after that.
//
// Remapped columns outside the source are clamped to the nearest edge column
// by default; `WarpPolicy::Fail` reports them as OutOfBounds instead. Rows
// are never remapped.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{RasterError, Result};
use crate::image::{RasterBuffer, Rgb};

/// One linear piece: `i = base + (x − origin) · num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearSegment {
    pub origin: i64,
    pub base: i64,
    pub num: i64,
    pub den: i64,
}

impl LinearSegment {
    pub const fn new(origin: i64, base: i64, num: i64, den: i64) -> Self {
        LinearSegment { origin, base, num, den }
    }

    /// Source column for destination column `x`. `den` must be non-zero.
    ///
    /// Evaluated in i128. A result beyond the i64 range saturates to
    /// `i64::MIN` or `i64::MAX`, which every policy treats as out of range.
    #[inline]
    pub fn apply(&self, x: i64) -> i64 {
        let dx = x as i128 - self.origin as i128;
        let col = dx
            .checked_mul(self.num as i128)
            .map(|v| v / self.den as i128)
            .and_then(|v| v.checked_add(self.base as i128));
        match col {
            Some(v) => v.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            None if (dx < 0) ^ (self.num < 0) ^ (self.den < 0) => i64::MIN,
            None => i64::MAX,
        }
    }
}

/// What to do with a remapped column outside the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarpPolicy {
    /// Sample the nearest valid column.
    #[default]
    Clamp,
    /// Abort with `OutOfBounds`, reporting the remapped source column as `x`
    /// and `y: 0`.
    Fail,
}

/// Breakpoints, segments and out-of-range policy for `warp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    pub breakpoints: (i64, i64),
    pub segments: [LinearSegment; 3],
    pub policy: WarpPolicy,
}

impl Default for WarpConfig {
    fn default() -> Self {
        WarpConfig {
            breakpoints: (100, 400),
            segments: [
                LinearSegment::new(0, 0, 2, 1),
                LinearSegment::new(100, 200, 1, 3),
                LinearSegment::new(400, 300, 1, 1),
            ],
            policy: WarpPolicy::Clamp,
        }
    }
}

impl WarpConfig {
    /// Rejects zero denominators and breakpoints out of order.
    pub fn validate(&self) -> Result<()> {
        let (b0, b1) = self.breakpoints;
        if b0 > b1 {
            return Err(RasterError::DegenerateInput(format!(
                "warp breakpoints out of order: {b0} > {b1}"
            )));
        }
        if let Some(k) = self.segments.iter().position(|s| s.den == 0) {
            return Err(RasterError::DegenerateInput(format!(
                "warp segment {k} has a zero denominator"
            )));
        }
        Ok(())
    }

    /// Segment index used for destination column `x`.
    #[inline]
    pub fn segment_for(&self, x: i64) -> usize {
        let (b0, b1) = self.breakpoints;
        if x < b0 {
            0
        } else if x < b1 {
            1
        } else {
            2
        }
    }

    /// Unclamped source column for destination column `x`.
    #[inline]
    pub fn remap_column(&self, x: i64) -> i64 {
        self.segments[self.segment_for(x)].apply(x)
    }
}

/// Source column for every destination column, after the policy.
///
/// Under `WarpPolicy::Fail` the `OutOfBounds` error carries the remapped
/// source column in `x` (saturated to the i64 range) and `y: 0`, since the
/// column table is shared by every row.
fn column_table(config: &WarpConfig, width: u32, height: u32) -> Result<Vec<usize>> {
    let last = width as i64 - 1;
    (0..width as i64)
        .map(|x| {
            let i = config.remap_column(x);
            if (0..=last).contains(&i) {
                return Ok(i as usize);
            }
            match config.policy {
                WarpPolicy::Clamp => Ok(i.clamp(0, last) as usize),
                WarpPolicy::Fail => {
                    debug!(dest_column = x, source_column = i, "remapped column outside source");
                    Err(RasterError::OutOfBounds {
                        x: i,
                        y: 0,
                        width,
                        height,
                    })
                }
            }
        })
        .collect()
}

/// Warp `src` horizontally into a new buffer of the same size.
///
/// Fails with `DegenerateInput` for an invalid `config` and, under
/// `WarpPolicy::Fail`, with `OutOfBounds` for the first destination column
/// whose source column lies outside `src`. That error reports the offending
/// source column as `x` and always `y: 0`; rows are never remapped.
#[instrument(skip_all, fields(width = src.width(), height = src.height(), policy = ?config.policy))]
pub fn warp(src: &RasterBuffer, config: &WarpConfig) -> Result<RasterBuffer> {
    config.validate()?;
    let columns = column_table(config, src.width(), src.height())?;

    let clamped = columns
        .iter()
        .enumerate()
        .filter(|&(x, &i)| config.remap_column(x as i64) != i as i64)
        .count();

    let mut dst = RasterBuffer::new(src.width(), src.height());
    dst.par_rows_mut().for_each(|(y, row)| {
        let line: &[Rgb] = src.row(y as u32);
        for (out, &i) in row.iter_mut().zip(columns.iter()) {
            *out = line[i];
        }
    });

    debug!(clamped_columns = clamped, "warp complete");
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_ramp(w: u32, h: u32) -> RasterBuffer {
        RasterBuffer::from_fn(w, h, |x, y| Rgb::new((x % 256) as u8, (x / 256) as u8, y as u8))
    }

    fn column_of(c: Rgb) -> i64 {
        c.r as i64 + 256 * c.g as i64
    }

    #[test]
    fn test_default_segments() {
        let cfg = WarpConfig::default();
        assert_eq!(cfg.remap_column(0), 0);
        assert_eq!(cfg.remap_column(49), 98);
        assert_eq!(cfg.remap_column(99), 198);
        // x = 100 belongs to the middle segment.
        assert_eq!(cfg.remap_column(100), 200);
        assert_eq!(cfg.remap_column(103), 201);
        assert_eq!(cfg.remap_column(399), 299);
        assert_eq!(cfg.remap_column(400), 300);
        assert_eq!(cfg.remap_column(450), 350);
    }

    #[test]
    fn test_segment_boundaries() {
        let cfg = WarpConfig::default();
        assert_eq!(cfg.segment_for(99), 0);
        assert_eq!(cfg.segment_for(100), 1);
        assert_eq!(cfg.segment_for(399), 1);
        assert_eq!(cfg.segment_for(400), 2);
    }

    #[test]
    fn test_warp_samples_remapped_columns() {
        let src = column_ramp(500, 3);
        let out = warp(&src, &WarpConfig::default()).unwrap();
        assert_eq!(out.dimensions(), src.dimensions());
        for y in 0..3 {
            assert_eq!(column_of(out[(10, y)]), 20);
            assert_eq!(column_of(out[(160, y)]), 220);
            assert_eq!(column_of(out[(420, y)]), 320);
            // Rows are not remapped.
            assert_eq!(out[(10, y)].b, y as u8);
        }
    }

    #[test]
    fn test_clamp_policy() {
        // Columns 0..20 map to 0..40, but the source is only 20 wide.
        let src = column_ramp(20, 2);
        let out = warp(&src, &WarpConfig::default()).unwrap();
        assert_eq!(column_of(out[(5, 0)]), 10);
        assert_eq!(column_of(out[(10, 1)]), 19);
        assert_eq!(column_of(out[(19, 1)]), 19);
    }

    #[test]
    fn test_fail_policy() {
        let src = column_ramp(20, 2);
        let cfg = WarpConfig {
            policy: WarpPolicy::Fail,
            ..WarpConfig::default()
        };
        assert_eq!(
            warp(&src, &cfg),
            Err(RasterError::OutOfBounds { x: 20, y: 0, width: 20, height: 2 })
        );
    }

    #[test]
    fn test_negative_column_clamps_to_zero() {
        let cfg = WarpConfig {
            segments: [LinearSegment::new(0, -5, 1, 1); 3],
            ..WarpConfig::default()
        };
        let src = column_ramp(10, 1);
        let out = warp(&src, &cfg).unwrap();
        assert_eq!(column_of(out[(2, 0)]), 0);
        assert_eq!(column_of(out[(7, 0)]), 2);
    }

    #[test]
    fn test_extreme_slopes_saturate() {
        let steep = LinearSegment::new(0, 0, i64::MAX, 1);
        assert_eq!(steep.apply(1), i64::MAX);
        assert_eq!(steep.apply(3), i64::MAX);
        assert_eq!(LinearSegment::new(0, 0, i64::MIN, 1).apply(2), i64::MIN);
        assert_eq!(LinearSegment::new(0, i64::MAX, 1, 1).apply(3), i64::MAX);
        assert_eq!(LinearSegment::new(i64::MAX, 0, i64::MAX, 1).apply(-1), i64::MIN);

        let src = column_ramp(4, 1);
        let mut cfg = WarpConfig {
            segments: [steep; 3],
            ..WarpConfig::default()
        };
        let out = warp(&src, &cfg).unwrap();
        let cols: Vec<i64> = (0..4).map(|x| column_of(out[(x, 0)])).collect();
        assert_eq!(cols, vec![0, 3, 3, 3]);

        cfg.segments = [LinearSegment::new(0, 0, i64::MIN, 1); 3];
        let out = warp(&src, &cfg).unwrap();
        assert!((0..4).all(|x| column_of(out[(x, 0)]) == 0));

        cfg.segments = [steep; 3];
        cfg.policy = WarpPolicy::Fail;
        assert_eq!(
            warp(&src, &cfg),
            Err(RasterError::OutOfBounds { x: i64::MAX, y: 0, width: 4, height: 1 })
        );
    }

    #[test]
    fn test_identity_config() {
        let cfg = WarpConfig {
            segments: [LinearSegment::new(0, 0, 1, 1); 3],
            ..WarpConfig::default()
        };
        let src = column_ramp(30, 4);
        assert_eq!(warp(&src, &cfg).unwrap(), src);
    }

    #[test]
    fn test_invalid_config() {
        let mut cfg = WarpConfig::default();
        cfg.segments[1].den = 0;
        assert!(matches!(cfg.validate(), Err(RasterError::DegenerateInput(_))));

        let cfg = WarpConfig {
            breakpoints: (300, 200),
            ..WarpConfig::default()
        };
        assert!(matches!(
            warp(&RasterBuffer::new(4, 4), &cfg),
            Err(RasterError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_empty_source() {
        let out = warp(&RasterBuffer::new(0, 0), &WarpConfig::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let cfg: WarpConfig = serde_json::from_str(r#"{"policy": "fail"}"#).unwrap();
        assert_eq!(cfg.policy, WarpPolicy::Fail);
        assert_eq!(cfg.breakpoints, (100, 400));
    }
}
