// histeq.rs — Per-channel histogram equalization.
//
// Spreads each channel's value distribution over [0, 255] so that low
// contrast images use the full range. Red, green and blue are equalized
// independently, each with its own table.
//
// Algorithm (per channel):
//   1. Histogram: hist[v] = number of pixels whose channel equals v.
//   2. CDF:       cdf[0] = hist[0], cdf[i] = cdf[i−1] + hist[i].
//   3. cdf_min:   the cumulative count at the lowest value that occurs,
//                 i.e. the smallest non-zero CDF entry.
//   4. Map:       map[i] = round((cdf[i] − cdf_min) · 255 / (N − 1))
//                 in f64, rounding half away from zero, with the
//                 numerator saturating at 0 and the result clamped to
//                 [0, 255].
//   5. Remap every pixel through the three tables.
//
// A channel holding a single value v everywhere therefore maps v to 0
// (cdf[v] == cdf_min == N). N < 2 has no defined mapping (the divisor is
// N − 1) and is reported as DegenerateInput.
//
// The tables are rebuilt on every call and never cached.

use tracing::{debug, instrument};

use crate::error::{RasterError, Result};
use crate::image::{Channel, RasterBuffer, Rgb};

/// Histogram, CDF and remap table for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTable {
    pub histogram: [u64; 256],
    pub cdf: [u64; 256],
    pub cdf_min: u64,
    pub map: [u8; 256],
}

/// The three channel tables built from one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizationTables {
    channels: [ChannelTable; 3],
    total_pixels: u64,
}

/// Count channel values of every pixel, one 256-bucket histogram per channel.
pub fn histograms(src: &RasterBuffer) -> [[u64; 256]; 3] {
    let mut hist = [[0u64; 256]; 3];
    for c in src.as_slice() {
        hist[0][c.r as usize] += 1;
        hist[1][c.g as usize] += 1;
        hist[2][c.b as usize] += 1;
    }
    hist
}

/// Build the CDF and remap table for one channel histogram over `total`
/// pixels. `total` must be at least 2.
fn build_table(histogram: &[u64; 256], total: u64) -> ChannelTable {
    let mut cdf = [0u64; 256];
    cdf[0] = histogram[0];
    for i in 1..256 {
        cdf[i] = cdf[i - 1] + histogram[i];
    }

    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    let denom = (total - 1) as f64;

    let mut map = [0u8; 256];
    for (m, &c) in map.iter_mut().zip(cdf.iter()) {
        let num = c.saturating_sub(cdf_min) as f64;
        *m = (num * 255.0 / denom).round().clamp(0.0, 255.0) as u8;
    }

    ChannelTable {
        histogram: *histogram,
        cdf,
        cdf_min,
        map,
    }
}

impl EqualizationTables {
    /// Build all three tables from `src`.
    ///
    /// Fails with `DegenerateInput` when `src` has fewer than two pixels.
    pub fn build(src: &RasterBuffer) -> Result<Self> {
        let total = src.pixel_count() as u64;
        if total < 2 {
            return Err(RasterError::DegenerateInput(format!(
                "histogram equalization needs at least 2 pixels, got {total}"
            )));
        }
        let [r, g, b] = histograms(src);
        Ok(EqualizationTables {
            channels: [
                build_table(&r, total),
                build_table(&g, total),
                build_table(&b, total),
            ],
            total_pixels: total,
        })
    }

    pub fn channel(&self, channel: Channel) -> &ChannelTable {
        &self.channels[channel.index()]
    }

    pub fn total_pixels(&self) -> u64 {
        self.total_pixels
    }

    /// Remap one pixel through the per-channel tables.
    #[inline]
    pub fn remap(&self, c: Rgb) -> Rgb {
        Rgb::new(
            self.channels[0].map[c.r as usize],
            self.channels[1].map[c.g as usize],
            self.channels[2].map[c.b as usize],
        )
    }

    /// Remap every pixel of `src` into a new buffer.
    pub fn apply(&self, src: &RasterBuffer) -> RasterBuffer {
        src.map(|c| self.remap(c))
    }
}

/// Equalize each channel of `src` into a new buffer.
#[instrument(skip_all, fields(width = src.width(), height = src.height()))]
pub fn equalize_histogram(src: &RasterBuffer) -> Result<RasterBuffer> {
    let tables = EqualizationTables::build(src)?;
    debug!(
        cdf_min_r = tables.channels[0].cdf_min,
        cdf_min_g = tables.channels[1].cdf_min,
        cdf_min_b = tables.channels[2].cdf_min,
        "equalization tables built"
    );
    Ok(tables.apply(src))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_row(values: &[u8]) -> RasterBuffer {
        RasterBuffer::from_vec(
            values.len() as u32,
            1,
            values.iter().map(|&v| Rgb::gray(v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_histogram_counts() {
        let img = RasterBuffer::from_vec(
            3,
            1,
            vec![Rgb::new(0, 5, 9), Rgb::new(0, 6, 9), Rgb::new(1, 5, 9)],
        )
        .unwrap();
        let [r, g, b] = histograms(&img);
        assert_eq!((r[0], r[1]), (2, 1));
        assert_eq!((g[5], g[6]), (2, 1));
        assert_eq!(b[9], 3);
        assert_eq!(r.iter().sum::<u64>(), 3);
    }

    #[test]
    fn test_cdf_and_cdf_min() {
        let img = gray_row(&[3, 3, 7, 200]);
        let t = EqualizationTables::build(&img).unwrap();
        let red = t.channel(Channel::Red);
        assert_eq!(red.cdf[2], 0);
        assert_eq!(red.cdf[3], 2);
        assert_eq!(red.cdf[7], 3);
        assert_eq!(red.cdf[255], 4);
        // Lowest occurring value is 3, with cumulative count 2.
        assert_eq!(red.cdf_min, 2);
        assert_eq!(t.total_pixels(), 4);
    }

    #[test]
    fn test_evenly_spread_values_are_fixed_points() {
        let img = gray_row(&[0, 85, 170, 255]);
        let out = equalize_histogram(&img).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_map_rounds_to_nearest() {
        // N = 3, cdf_min = 1. Middle value: (2 − 1) · 255 / 2 = 127.5 → 128.
        let img = gray_row(&[10, 20, 30]);
        let out = equalize_histogram(&img).unwrap();
        assert_eq!(out[(0, 0)], Rgb::gray(0));
        assert_eq!(out[(1, 0)], Rgb::gray(128));
        assert_eq!(out[(2, 0)], Rgb::gray(255));
    }

    #[test]
    fn test_single_value_maps_to_zero() {
        let img = RasterBuffer::filled(10, 10, Rgb::new(128, 3, 250));
        let out = equalize_histogram(&img).unwrap();
        assert!(out.pixels().all(|(_, _, c)| c == Rgb::BLACK));
    }

    #[test]
    fn test_degenerate_sizes() {
        for img in [RasterBuffer::new(1, 1), RasterBuffer::new(0, 0), RasterBuffer::new(0, 5)] {
            assert!(matches!(
                equalize_histogram(&img),
                Err(RasterError::DegenerateInput(_))
            ));
        }
        assert!(equalize_histogram(&RasterBuffer::new(2, 1)).is_ok());
    }

    #[test]
    fn test_channels_equalized_independently() {
        // Red spans two values, green is constant, blue spans three.
        let img = RasterBuffer::from_vec(
            3,
            1,
            vec![Rgb::new(50, 9, 10), Rgb::new(60, 9, 20), Rgb::new(60, 9, 30)],
        )
        .unwrap();
        let out = equalize_histogram(&img).unwrap();
        // Red: cdf_min = 1; map[60] = (3 − 1) · 255 / 2 = 255.
        assert_eq!(out[(0, 0)], Rgb::new(0, 0, 0));
        assert_eq!(out[(1, 0)], Rgb::new(255, 0, 128));
        assert_eq!(out[(2, 0)], Rgb::new(255, 0, 255));
    }

    #[test]
    fn test_low_contrast_is_stretched() {
        let w = 110;
        let img = RasterBuffer::from_fn(w, 1, |x, _| Rgb::gray((100 + x % 11) as u8));
        let out = equalize_histogram(&img).unwrap();
        let lo = out.pixels().map(|(_, _, c)| c.r).min().unwrap();
        let hi = out.pixels().map(|(_, _, c)| c.r).max().unwrap();
        // Eleven values, ten pixels each: the top one lands at
        // (110 − 10) · 255 / 109 = 233.9 → 234.
        assert_eq!(lo, 0);
        assert_eq!(hi, 234);
    }

    #[test]
    fn test_preserves_ordering() {
        let img = gray_row(&[10, 50, 100, 150, 200]);
        let out = equalize_histogram(&img).unwrap();
        for x in 1..5 {
            assert!(out[(x, 0)].r >= out[(x - 1, 0)].r, "monotonicity violated at {x}");
        }
    }

    #[test]
    fn test_second_pass_is_stable() {
        let img = RasterBuffer::from_fn(16, 16, |x, y| Rgb::gray(((x * 7 + y * 3) % 40 + 90) as u8));
        let once = equalize_histogram(&img).unwrap();
        let twice = equalize_histogram(&once).unwrap();
        for ((_, _, a), (_, _, b)) in once.pixels().zip(twice.pixels()) {
            assert!((a.r as i32 - b.r as i32).abs() <= 1, "{a:?} vs {b:?}");
        }
    }
}
