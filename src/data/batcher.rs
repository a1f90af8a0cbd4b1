// ============================================================
// Layer 4 — Frame Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<FrameSample>
// into the two 4-D tensors the training loops consume.
//
// How batching works here:
//   Input:  Vec of N FrameSamples, each holding flat planes
//   Output: FrameBatch with
//             inputs  [N, in_channels, shots, samples]
//             targets [N, depth,       shots, samples]
//
//   Every sample is already row-major (depth, shot, sample),
//   so concatenating them one after another is exactly the
//   row-major layout of the batched tensor.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::FrameSample;
use crate::domain::dims::Shape4;

// ─── FrameBatch ───────────────────────────────────────────────────────────────
/// A batch of samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct FrameBatch<B: Backend> {
    /// Raw acquisition data — [batch, in_channels, shots, samples]
    pub inputs: Tensor<B, 4>,

    /// Ground-truth sequence — [batch, depth, shots, samples]
    pub targets: Tensor<B, 4>,
}

// ─── FrameBatcher ─────────────────────────────────────────────────────────────
/// Holds the target device plus the per-sample shapes needed to
/// rebuild 4-D tensors from flat sample vectors.
#[derive(Clone, Debug)]
pub struct FrameBatcher<B: Backend> {
    pub device:   B::Device,
    input_shape:  Shape4,
    target_shape: Shape4,
}

impl<B: Backend> FrameBatcher<B> {
    pub fn new(device: B::Device, input_shape: Shape4, target_shape: Shape4) -> Self {
        Self { device, input_shape, target_shape }
    }

    fn stack(&self, flat: Vec<f32>, shape: Shape4) -> Tensor<B, 4> {
        Tensor::<B, 4>::from_data(TensorData::new(flat, shape.dims()), &self.device)
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<FrameSample, FrameBatch<B>> for FrameBatcher<B> {
    fn batch(&self, items: Vec<FrameSample>) -> FrameBatch<B> {
        let batch_size = items.len();

        let input_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.input.iter().copied())
            .collect();

        let target_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.target.iter().copied())
            .collect();

        FrameBatch {
            inputs:  self.stack(input_flat,  self.input_shape.with_batch(batch_size)),
            targets: self.stack(target_flat, self.target_shape.with_batch(batch_size)),
        }
    }
}
