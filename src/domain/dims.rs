// ============================================================
// Layer 3 — Sequence Dimensions and Shape Descriptors
// ============================================================
// SequenceDims replaces a module of free-floating constants:
// it is built once (from the CLI or TrainConfig) and handed to
// every constructor and training entry point that needs it.
//
// Shape4 is the checked descriptor for the 4-D tensors that
// flow through the pipeline:
//
//   input      [batch, in_channels,  shots, samples]
//   target     [batch, frames,       shots, samples]
//   shot out   [batch, out_channels, shots, samples]
//
// The second axis is called `depth` because it is channels for
// inputs and frames for targets.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when a tensor or configuration does not have
/// the dimensions a module boundary expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("{what}: expected shape {expected}, got {actual}")]
    Mismatch {
        what:     &'static str,
        expected: Shape4,
        actual:   Shape4,
    },

    #[error("dimension '{name}' must be greater than zero")]
    ZeroDimension { name: &'static str },

    #[error("attention width {d_model} is not divisible by {heads} heads")]
    HeadsDoNotDivide { d_model: usize, heads: usize },

    #[error("{what}: expected [{batch}, *, {width}], got {actual:?}")]
    Sequence {
        what:   &'static str,
        batch:  usize,
        width:  usize,
        actual: [usize; 3],
    },

    #[error("frame index {index} is outside the {frames}-frame prediction buffer")]
    FrameOutOfRange { index: usize, frames: usize },
}

// ─── SequenceDims ─────────────────────────────────────────────────────────────
/// Fixed sequence-shape parameters shared by the models and the data pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDims {
    /// Frames in one acquisition sequence (the prediction horizon)
    pub frames: usize,
    /// Interleaved shots per frame
    pub shots: usize,
    /// Readout samples per shot
    pub samples: usize,
    /// Channels of the raw input tensor
    pub in_channels: usize,
    /// Channels produced by the shot encoder
    pub out_channels: usize,
    /// Width of the pooled feature vector inside the trajectory attention
    pub feature_dim: usize,
}

impl Default for SequenceDims {
    fn default() -> Self {
        Self {
            frames:       8,
            shots:        8,
            samples:      64,
            in_channels:  1,
            out_channels: 2,
            feature_dim:  64,
        }
    }
}

impl SequenceDims {
    /// Reject any zero-sized dimension.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let named = [
            ("frames",       self.frames),
            ("shots",        self.shots),
            ("samples",      self.samples),
            ("in_channels",  self.in_channels),
            ("out_channels", self.out_channels),
            ("feature_dim",  self.feature_dim),
        ];
        for (name, value) in named {
            if value == 0 {
                return Err(ShapeError::ZeroDimension { name });
            }
        }
        Ok(())
    }

    /// Shape of one raw input batch
    pub fn input_shape(&self, batch: usize) -> Shape4 {
        Shape4::new(batch, self.in_channels, self.shots, self.samples)
    }

    /// Shape of one full-sequence target batch
    pub fn target_shape(&self, batch: usize) -> Shape4 {
        Shape4::new(batch, self.frames, self.shots, self.samples)
    }

    /// Attention width used by the shot predictor: one token per shot,
    /// carrying every sample of every encoded channel.
    pub fn shot_d_model(&self) -> usize {
        self.samples * self.out_channels
    }

    /// Values in one shot-by-sample plane
    pub fn plane_len(&self) -> usize {
        self.shots * self.samples
    }
}

/// Fails unless `heads` splits `d_model` evenly.
pub fn check_heads(d_model: usize, heads: usize) -> Result<(), ShapeError> {
    if heads == 0 || d_model % heads != 0 {
        return Err(ShapeError::HeadsDoNotDivide { d_model, heads });
    }
    Ok(())
}

/// Check a batch-first token sequence `[batch, len, width]`; any length is accepted.
pub fn check_sequence(
    what:   &'static str,
    batch:  usize,
    width:  usize,
    actual: [usize; 3],
) -> Result<(), ShapeError> {
    if actual[0] != batch || actual[2] != width {
        return Err(ShapeError::Sequence { what, batch, width, actual });
    }
    Ok(())
}

// ─── Shape4 ───────────────────────────────────────────────────────────────────
/// Explicit dimension descriptor for a 4-D tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape4 {
    pub batch:   usize,
    pub depth:   usize,
    pub shots:   usize,
    pub samples: usize,
}

impl Shape4 {
    pub fn new(batch: usize, depth: usize, shots: usize, samples: usize) -> Self {
        Self { batch, depth, shots, samples }
    }

    pub fn from_dims(dims: [usize; 4]) -> Self {
        Self::new(dims[0], dims[1], dims[2], dims[3])
    }

    pub fn dims(&self) -> [usize; 4] {
        [self.batch, self.depth, self.shots, self.samples]
    }

    /// Same shape with a different batch size
    pub fn with_batch(self, batch: usize) -> Self {
        Self { batch, ..self }
    }

    /// Compare against the dims of a runtime tensor.
    ///
    /// `what` names the boundary being checked and ends up in the error.
    pub fn check(&self, what: &'static str, actual: [usize; 4]) -> Result<(), ShapeError> {
        let actual = Shape4::from_dims(actual);
        if *self != actual {
            return Err(ShapeError::Mismatch { what, expected: *self, actual });
        }
        Ok(())
    }
}

impl fmt::Display for Shape4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.batch, self.depth, self.shots, self.samples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dims_are_valid() {
        assert!(SequenceDims::default().validate().is_ok());
    }

    #[test]
    fn test_zero_dimension_is_rejected() {
        let dims = SequenceDims { shots: 0, ..SequenceDims::default() };
        assert_eq!(
            dims.validate(),
            Err(ShapeError::ZeroDimension { name: "shots" })
        );
    }

    #[test]
    fn test_derived_shapes() {
        let dims = SequenceDims::default();
        assert_eq!(dims.input_shape(4).dims(),       [4, 1, 8, 64]);
        assert_eq!(dims.target_shape(4).dims(),      [4, 8, 8, 64]);
        assert_eq!(dims.shot_d_model(), 128);
    }

    #[test]
    fn test_check_reports_mismatch() {
        let expected = Shape4::new(4, 1, 8, 64);
        assert!(expected.check("input", [4, 1, 8, 64]).is_ok());

        let err = expected.check("input", [4, 2, 8, 64]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "input: expected shape [4, 1, 8, 64], got [4, 2, 8, 64]"
        );
    }

    #[test]
    fn test_sequence_check_ignores_length() {
        assert!(check_sequence("memory", 2, 16, [2, 40, 16]).is_ok());
        assert!(matches!(
            check_sequence("memory", 2, 16, [3, 8, 16]),
            Err(ShapeError::Sequence { .. })
        ));
    }

    #[test]
    fn test_heads_must_divide_width() {
        assert!(check_heads(128, 4).is_ok());
        assert_eq!(
            check_heads(64, 3),
            Err(ShapeError::HeadsDoNotDivide { d_model: 64, heads: 3 })
        );
        assert!(check_heads(64, 0).is_err());
    }
}
