// error.rs — Error kinds reported by raster operators.
//
// Every failure is value-returned. Nothing here logs; whether a failure is
// worth a message is the caller's decision.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RasterError {
    /// Two buffers that must share an extent do not.
    #[error("dimension mismatch: expected {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("pixel ({x},{y}) out of bounds for {width}x{height} buffer")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },

    /// Input for which the operator is undefined (single-pixel equalization,
    /// zero kernel divisor, alpha outside [0,1], ...).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("channel value {value} outside [0, 255]")]
    InvalidChannelValue { value: i64 },

    /// Raised by the `image` collaborator adapters only.
    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RasterError>;

impl From<serde_json::Error> for RasterError {
    fn from(err: serde_json::Error) -> Self {
        RasterError::Config(err.to_string())
    }
}

#[cfg(feature = "image-io")]
impl From<::image::ImageError> for RasterError {
    fn from(err: ::image::ImageError) -> Self {
        RasterError::Encode(err.to_string())
    }
}

/// Check that two extents agree, reporting `actual` against `expected`.
pub(crate) fn ensure_same_size(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(RasterError::DimensionMismatch { expected, actual })
    }
}
