// composite.rs — Chroma-key compositing of an overlay onto a base buffer.
//
// Every overlay pixel (i, j) is tested against a key predicate. Keyed pixels
// (the "green screen") are dropped; all others are written to the base at
// (i + dx, j + dy). Targets that fall outside the base are skipped one pixel
// at a time.
//
// This is the only operator that mutates its input: the base is updated in
// place and the pass is sequential. Callers compositing onto the same base
// from several threads must serialize those calls themselves.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::image::{RasterBuffer, Rgb};

/// Decides whether an overlay pixel is background to be keyed out.
pub trait KeyPredicate {
    fn is_key(&self, c: Rgb) -> bool;
}

impl<F> KeyPredicate for F
where
    F: Fn(Rgb) -> bool,
{
    fn is_key(&self, c: Rgb) -> bool {
        self(c)
    }
}

/// Keys out pixels whose green exceeds red and blue combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GreenScreen;

impl KeyPredicate for GreenScreen {
    #[inline]
    fn is_key(&self, c: Rgb) -> bool {
        c.g as u16 > c.r as u16 + c.b as u16
    }
}

/// Placement of the overlay on the base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromaKeyConfig {
    pub dx: i32,
    pub dy: i32,
}

impl ChromaKeyConfig {
    pub fn offset(&self) -> (i32, i32) {
        (self.dx, self.dy)
    }
}

/// Composite `overlay` onto `base` at `offset`, dropping pixels matched by
/// `key`. Returns the number of pixels copied into `base`.
#[instrument(
    skip_all,
    fields(
        base_width = base.width(),
        base_height = base.height(),
        overlay_width = overlay.width(),
        overlay_height = overlay.height(),
        dx = offset.0,
        dy = offset.1,
    )
)]
pub fn chroma_key<K>(
    base: &mut RasterBuffer,
    overlay: &RasterBuffer,
    offset: (i32, i32),
    key: &K,
) -> usize
where
    K: KeyPredicate + ?Sized,
{
    let (dx, dy) = (offset.0 as i64, offset.1 as i64);
    let mut copied = 0;
    let mut keyed = 0;
    let mut clipped = 0;

    for (i, j, c) in overlay.pixels() {
        if key.is_key(c) {
            keyed += 1;
            continue;
        }
        let (x, y) = (i as i64 + dx, j as i64 + dy);
        if !base.contains(x, y) {
            clipped += 1;
            continue;
        }
        base[(x as u32, y as u32)] = c;
        copied += 1;
    }

    debug!(copied, keyed, clipped, "chroma-key composite done");
    copied
}

/// `chroma_key` with the green-screen predicate and a configured offset.
pub fn green_screen(base: &mut RasterBuffer, overlay: &RasterBuffer, config: &ChromaKeyConfig) -> usize {
    chroma_key(base, overlay, config.offset(), &GreenScreen)
}
