use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::dims::Shape4;

/// One batch element: flattened input and target planes in
/// row-major (depth, shot, sample) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSample {
    pub input:  Vec<f32>,
    pub target: Vec<f32>,
}

/// In-memory dataset of equally shaped samples.
pub struct FrameDataset {
    samples:      Vec<FrameSample>,
    input_shape:  Shape4,
    target_shape: Shape4,
}

impl FrameDataset {
    /// `input_shape` and `target_shape` describe a single sample (batch = 1).
    pub fn new(samples: Vec<FrameSample>, input_shape: Shape4, target_shape: Shape4) -> Self {
        Self {
            samples,
            input_shape:  input_shape.with_batch(1),
            target_shape: target_shape.with_batch(1),
        }
    }

    pub fn input_shape(&self)  -> Shape4 { self.input_shape }
    pub fn target_shape(&self) -> Shape4 { self.target_shape }

    /// Number of batches one epoch yields, counting a trailing partial batch.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        self.samples.len().div_ceil(batch_size.max(1))
    }
}

impl Dataset<FrameSample> for FrameDataset {
    fn get(&self, index: usize) -> Option<FrameSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
