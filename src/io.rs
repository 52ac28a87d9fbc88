// io.rs — Contracts toward the image collaborators.
//
// Decoding, encoding, persistence and display live outside this crate.
// The core only sees:
//
//   RasterSource — something with a width, a height and a fallible get(x, y)
//   RasterSink   — something that accepts a finished buffer plus a format tag
//
// `codec.rs` (feature "image-io") implements both against the `image` crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{RasterError, Result};
use crate::image::{RasterBuffer, Rgb};

/// Read side of an image collaborator.
pub trait RasterSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Fails with `OutOfBounds` if `x >= width()` or `y >= height()`.
    fn get(&self, x: u32, y: u32) -> Result<Rgb>;
}

/// Write side of an image collaborator.
pub trait RasterSink {
    fn write(&mut self, buffer: &RasterBuffer, format: OutputFormat) -> Result<()>;
}

impl RasterSource for RasterBuffer {
    fn width(&self) -> u32 {
        RasterBuffer::width(self)
    }

    fn height(&self) -> u32 {
        RasterBuffer::height(self)
    }

    fn get(&self, x: u32, y: u32) -> Result<Rgb> {
        RasterBuffer::get(self, x, y)
    }
}

impl RasterBuffer {
    /// Populate a new buffer from a source collaborator.
    #[instrument(skip_all, fields(width = source.width(), height = source.height()))]
    pub fn from_source<S: RasterSource + ?Sized>(source: &S) -> Result<Self> {
        let (w, h) = (source.width(), source.height());
        let mut data = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                data.push(source.get(x, y)?);
            }
        }
        debug!(pixels = data.len(), "copied raster from source");
        RasterBuffer::from_vec(w, h, data)
    }
}

/// Output format tag handed to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Jpeg,
}

impl OutputFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(RasterError::Config(format!(
                "unsupported output format {other:?} (expected png or jpg)"
            ))),
        }
    }
}
