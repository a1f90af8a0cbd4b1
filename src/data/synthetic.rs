// ============================================================
// Layer 4 — Synthetic Data Generator
// ============================================================
// There is no real acquisition data yet, so every training run
// draws its inputs and targets uniformly from [0, 1).
//
// Each generated FrameSample holds one batch element:
//   input   in_channels × shots × samples
//   target  depth       × shots × samples
//
// where depth is the frame count (or out_channels for the plain
// loop, see TrainingVariant::target_depth).
//
// A fixed seed makes runs reproducible; StdRng is seeded
// explicitly instead of using thread_rng().

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::FrameSample;
use crate::domain::dims::{SequenceDims, Shape4};

/// Generate `count` random samples shaped for the given dims.
///
/// # Arguments
/// * `count`        - Number of samples to draw
/// * `dims`         - Sequence dimensions shared with the models
/// * `target_depth` - Frames per target (usually `dims.frames`)
/// * `seed`         - RNG seed
pub fn generate_dummy_data(
    count:        usize,
    dims:         &SequenceDims,
    target_depth: usize,
    seed:         u64,
) -> Vec<FrameSample> {
    let mut rng = StdRng::seed_from_u64(seed);

    let input_len  = dims.in_channels * dims.plane_len();
    let target_len = target_depth     * dims.plane_len();

    let samples: Vec<FrameSample> = (0..count)
        .map(|_| FrameSample {
            input:  uniform(&mut rng, input_len),
            target: uniform(&mut rng, target_len),
        })
        .collect();

    tracing::debug!(
        "Generated {} synthetic samples: input {}, target {}",
        samples.len(),
        dims.input_shape(1),
        Shape4::new(1, target_depth, dims.shots, dims.samples),
    );

    samples
}

fn uniform(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len).map(|_| rng.gen::<f32>()).collect()
}
