// rasterkit: pixel operators over in-memory RGB raster buffers
//
// Every operator is a plain function from input buffer(s) to a fresh output
// buffer. Decoding, encoding and display live behind the collaborator traits
// in `io`; with the `image-io` feature, `codec` adapts them to the `image`
// crate.

pub mod error;
pub mod image;
pub mod io;
pub mod convert;
pub mod kernel;
pub mod median;
pub mod convolution;
pub mod gradient;
pub mod histeq;
pub mod blend;
pub mod composite;
pub mod warp;
pub mod pipeline;

#[cfg(feature = "image-io")]
pub mod codec;

pub use crate::blend::{cross_fade, CrossFade};
pub use crate::composite::{chroma_key, ChromaKeyConfig, GreenScreen, KeyPredicate};
pub use crate::convert::grayscale;
pub use crate::convolution::{convolve, sharpen, smooth, OverflowPolicy};
pub use crate::error::{RasterError, Result};
pub use crate::gradient::{detect_edges, edges_from_color, EdgeConfig};
pub use crate::histeq::{equalize_histogram, EqualizationTables};
pub use crate::image::{Channel, RasterBuffer, Rgb};
pub use crate::io::{OutputFormat, RasterSink, RasterSource};
pub use crate::kernel::Kernel;
pub use crate::median::despeckle;
pub use crate::pipeline::{Operation, Pipeline};
pub use crate::warp::{warp, LinearSegment, WarpConfig, WarpPolicy};

#[cfg(feature = "image-io")]
pub use crate::codec::EncodedSink;
