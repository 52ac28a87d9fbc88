// kernel.rs — 3×3 integer convolution kernels.
//
// A kernel is nine signed weights plus a normalization divisor:
//
//   out = ( Σ weights[dy+1][dx+1] · in(x+dx, y+dy) ) / divisor
//
// Rows are indexed by dy (top row = dy −1), columns by dx. The divisor is
// never zero; that is checked once at construction (and on deserialization)
// so the convolution loop never has to.

use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};

/// An immutable 3×3 weight matrix with a non-zero divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KernelSpec", into = "KernelSpec")]
pub struct Kernel {
    weights: [[i32; 3]; 3],
    divisor: i32,
}

/// Unvalidated wire form of a kernel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct KernelSpec {
    weights: [[i32; 3]; 3],
    #[serde(default = "default_divisor")]
    divisor: i32,
}

fn default_divisor() -> i32 {
    1
}

impl TryFrom<KernelSpec> for Kernel {
    type Error = RasterError;

    fn try_from(spec: KernelSpec) -> Result<Self> {
        Kernel::new(spec.weights, spec.divisor)
    }
}

impl From<Kernel> for KernelSpec {
    fn from(k: Kernel) -> Self {
        KernelSpec {
            weights: k.weights,
            divisor: k.divisor,
        }
    }
}

impl Kernel {
    /// Build a kernel. Fails with `DegenerateInput` if `divisor == 0`.
    pub fn new(weights: [[i32; 3]; 3], divisor: i32) -> Result<Self> {
        if divisor == 0 {
            return Err(RasterError::DegenerateInput(
                "kernel divisor must be non-zero".to_string(),
            ));
        }
        Ok(Kernel { weights, divisor })
    }

    /// All-ones box filter divided by 9: the truncated neighborhood mean.
    pub const fn smooth() -> Self {
        Kernel {
            weights: [[1, 1, 1], [1, 1, 1], [1, 1, 1]],
            divisor: 9,
        }
    }

    /// Center +9, neighbors −1, divisor 1. Output may leave [0, 255].
    pub const fn sharpen() -> Self {
        Kernel {
            weights: [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]],
            divisor: 1,
        }
    }

    pub const fn identity() -> Self {
        Kernel {
            weights: [[0, 0, 0], [0, 1, 0], [0, 0, 0]],
            divisor: 1,
        }
    }

    #[inline]
    pub fn weights(&self) -> &[[i32; 3]; 3] {
        &self.weights
    }

    #[inline]
    pub fn divisor(&self) -> i32 {
        self.divisor
    }

    /// Weight applied to the neighbor at offset (dx, dy), each in −1..=1.
    ///
    /// # Panics
    /// Panics if an offset is outside −1..=1.
    #[inline]
    pub fn weight(&self, dx: i32, dy: i32) -> i32 {
        assert!(
            (-1..=1).contains(&dx) && (-1..=1).contains(&dy),
            "kernel offset ({dx},{dy}) outside 3x3 window"
        );
        self.weights[(dy + 1) as usize][(dx + 1) as usize]
    }

    /// Sum of all nine weights.
    pub fn weight_sum(&self) -> i32 {
        self.weights.iter().flatten().sum()
    }

    /// True when no weight or divisor is negative, i.e. every result of an
    /// 8-bit input stays within [0, 255] as long as the weights sum to at
    /// most the divisor.
    pub fn is_bounded(&self) -> bool {
        self.divisor > 0
            && self.weights.iter().flatten().all(|&w| w >= 0)
            && self.weight_sum() <= self.divisor
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_divisor_rejected() {
        let err = Kernel::new([[1; 3]; 3], 0).unwrap_err();
        assert!(matches!(err, RasterError::DegenerateInput(_)));
    }

    #[test]
    fn test_presets() {
        let s = Kernel::smooth();
        assert_eq!(s.weight_sum(), 9);
        assert_eq!(s.divisor(), 9);
        assert!(s.is_bounded());

        let sh = Kernel::sharpen();
        assert_eq!(sh.weight(0, 0), 9);
        assert_eq!(sh.weight(-1, 1), -1);
        assert_eq!(sh.weight_sum(), 1);
        assert!(!sh.is_bounded());

        assert_eq!(Kernel::default(), Kernel::identity());
    }

    #[test]
    fn test_weight_orientation() {
        let k = Kernel::new([[1, 2, 3], [4, 5, 6], [7, 8, 9]], 1).unwrap();
        assert_eq!(k.weight(-1, -1), 1); // top-left
        assert_eq!(k.weight(1, -1), 3); // top-right
        assert_eq!(k.weight(-1, 1), 7); // bottom-left
        assert_eq!(k.weight(0, 0), 5);
    }

    #[test]
    #[should_panic(expected = "outside 3x3")]
    fn test_weight_offset_panics() {
        Kernel::identity().weight(2, 0);
    }

    #[test]
    fn test_deserialize_validates_divisor() {
        let ok: Kernel =
            serde_json::from_str(r#"{"weights":[[0,1,0],[1,4,1],[0,1,0]],"divisor":8}"#).unwrap();
        assert_eq!(ok.divisor(), 8);

        let defaulted: Kernel =
            serde_json::from_str(r#"{"weights":[[0,0,0],[0,1,0],[0,0,0]]}"#).unwrap();
        assert_eq!(defaulted, Kernel::identity());

        let bad = serde_json::from_str::<Kernel>(r#"{"weights":[[1,1,1],[1,1,1],[1,1,1]],"divisor":0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_value(Kernel::sharpen()).unwrap();
        assert_eq!(json["divisor"], 1);
        assert_eq!(json["weights"][1][1], 9);
    }
}
