// pipeline.rs — Serializable chain of single-input operators.
//
// A driver describes what to run as data, e.g.
//
//   { "steps": [
//       { "op": "despeckle" },
//       { "op": "edges", "threshold": 120 },
//       { "op": "warp", "policy": "fail" } ] }
//
// and `Pipeline::run` feeds each step's output into the next. Every step
// produces a fresh buffer; the input is never modified. Two-input operators
// (cross-fade, chroma-key) take a second buffer from the caller and are not
// expressible here.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::convert::grayscale;
use crate::convolution::{convolve, OverflowPolicy};
use crate::error::Result;
use crate::gradient::{detect_edges, EdgeConfig};
use crate::histeq::equalize_histogram;
use crate::image::RasterBuffer;
use crate::kernel::Kernel;
use crate::median::despeckle;
use crate::warp::{warp, WarpConfig};

/// One step of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Grayscale,
    Despeckle,
    Smooth {
        #[serde(default)]
        policy: OverflowPolicy,
    },
    Sharpen {
        #[serde(default)]
        policy: OverflowPolicy,
    },
    Convolve {
        kernel: Kernel,
        #[serde(default)]
        policy: OverflowPolicy,
    },
    /// Grayscale is not implied; put a `grayscale` step first for color input.
    Edges(EdgeConfig),
    Equalize,
    Warp(WarpConfig),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Grayscale => "grayscale",
            Operation::Despeckle => "despeckle",
            Operation::Smooth { .. } => "smooth",
            Operation::Sharpen { .. } => "sharpen",
            Operation::Convolve { .. } => "convolve",
            Operation::Edges(_) => "edges",
            Operation::Equalize => "equalize",
            Operation::Warp(_) => "warp",
        }
    }

    /// Run this step on `src`.
    pub fn apply(&self, src: &RasterBuffer) -> Result<RasterBuffer> {
        Ok(match self {
            Operation::Grayscale => grayscale(src),
            Operation::Despeckle => despeckle(src),
            Operation::Smooth { policy } => convolve(src, &Kernel::smooth(), *policy),
            Operation::Sharpen { policy } => convolve(src, &Kernel::sharpen(), *policy),
            Operation::Convolve { kernel, policy } => convolve(src, kernel, *policy),
            Operation::Edges(config) => detect_edges(src, config),
            Operation::Equalize => equalize_histogram(src)?,
            Operation::Warp(config) => warp(src, config)?,
        })
    }
}

/// An ordered list of operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub steps: Vec<Operation>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step, builder style.
    pub fn then(mut self, op: Operation) -> Self {
        self.steps.push(op);
        self
    }

    /// Parse a pipeline description. Malformed JSON, unknown operations and
    /// invalid kernels all surface as `RasterError::Config`.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order. An empty pipeline returns a copy of `src`.
    /// The first failing step aborts the run.
    #[instrument(skip_all, fields(steps = self.steps.len(), width = src.width(), height = src.height()))]
    pub fn run(&self, src: &RasterBuffer) -> Result<RasterBuffer> {
        let mut current = src.clone();
        for (i, op) in self.steps.iter().enumerate() {
            debug!(step = i, op = op.name(), "running step");
            current = op.apply(&current)?;
        }
        debug!(steps = self.steps.len(), "pipeline finished");
        Ok(current)
    }
}
