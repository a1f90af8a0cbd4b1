// ============================================================
// Layer 5 — Training Loops
// ============================================================
// Every variant runs the same skeleton:
//
//   for epoch in 1..=epochs
//     for batch in loader
//       prediction = <variant forward>
//       loss       = MSE(prediction, target)
//       grads      = loss.backward()
//       model      = adam.step(lr, model, grads)
//
// Variants only supply the forward closure:
//   plain / trajectory   one predict() call per batch
//   shot / accumulating  unroll_shot(), one call per frame
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{path::PathBuf, sync::Arc};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{FrameBatch, FrameBatcher},
    dataset::FrameDataset,
};
use crate::domain::{
    dims::{Shape4, ShapeError},
    variant::{ShotMode, TrainingVariant},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::{
    SequencePredictor, ShotPredictor, ShotPredictorConfig, TrajectoryPredictorConfig,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Loop knobs that do not depend on the model.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub epochs:            usize,
    pub lr:                f64,
    pub log_every:         usize,
    pub batches_per_epoch: usize,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub history:    Vec<EpochMetrics>,
    pub checkpoint: PathBuf,
    pub metrics:    PathBuf,
}

pub fn run_training(
    cfg:          &TrainConfig,
    dataset:      FrameDataset,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainingSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_on_device::<MyBackend>(cfg, dataset, ckpt_manager, &device)
}

/// Build the model for `cfg.variant`, train it, and save its parameters.
pub fn train_on_device<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    dataset:      FrameDataset,
    ckpt_manager: &CheckpointManager,
    device:       &B::Device,
) -> Result<TrainingSummary> {
    let settings = LoopSettings {
        epochs:            cfg.epochs,
        lr:                cfg.lr,
        log_every:         cfg.log_every,
        batches_per_epoch: dataset.num_batches(cfg.batch_size),
    };
    let metrics = MetricsLogger::new(&cfg.output_dir)?;
    let loader  = build_loader::<B>(cfg, dataset, device);

    tracing::info!(
        "Training variant '{}' for {} epochs ({} batches per epoch)",
        cfg.variant, settings.epochs, settings.batches_per_epoch
    );

    let (history, checkpoint) = match cfg.variant {
        TrainingVariant::Plain => {
            let model = shot_config(cfg).init::<B>(device)?;
            tracing::info!("Shot predictor ready: {} parameters", model.num_params());
            let (model, history) = train_single_pass(model, loader.as_ref(), &settings, Some(&metrics))?;
            (history, ckpt_manager.save_model(&model)?)
        }
        TrainingVariant::Trajectory => {
            let model = trajectory_config(cfg).init::<B>(device)?;
            tracing::info!("Trajectory predictor ready: {} parameters", model.num_params());
            let (model, history) = train_single_pass(model, loader.as_ref(), &settings, Some(&metrics))?;
            (history, ckpt_manager.save_model(&model)?)
        }
        TrainingVariant::Shot | TrainingVariant::ShotAccumulating => {
            let mode = cfg.variant.shot_mode().unwrap_or(ShotMode::LastFrame);
            let model = shot_config(cfg).init::<B>(device)?;
            tracing::info!("Shot predictor ready: {} parameters ({:?})", model.num_params(), mode);
            let (model, history) = train_shot_unrolled(
                model, loader.as_ref(), &settings, Some(&metrics), cfg.dims.frames, mode,
            )?;
            (history, ckpt_manager.save_model(&model)?)
        }
    };

    tracing::info!("Training complete!");
    Ok(TrainingSummary { history, checkpoint, metrics: metrics.csv_path().clone() })
}

pub fn trajectory_config(cfg: &TrainConfig) -> TrajectoryPredictorConfig {
    TrajectoryPredictorConfig::new(cfg.dims)
        .with_n_heads(cfg.trajectory_heads)
        .with_n_layers(cfg.num_layers)
        .with_d_ff(cfg.d_ff)
        .with_dropout(cfg.dropout)
}

pub fn shot_config(cfg: &TrainConfig) -> ShotPredictorConfig {
    ShotPredictorConfig::new(cfg.dims)
        .with_n_heads(cfg.shot_heads)
        .with_n_layers(cfg.num_layers)
        .with_d_ff(cfg.d_ff)
        .with_dropout(cfg.dropout)
}

fn build_loader<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    dataset: FrameDataset,
    device:  &B::Device,
) -> Arc<dyn DataLoader<FrameBatch<B>>> {
    let batcher = FrameBatcher::<B>::new(device.clone(), dataset.input_shape(), dataset.target_shape());
    let mut builder = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed);
    if cfg.num_workers > 0 {
        builder = builder.num_workers(cfg.num_workers);
    }
    builder.build(dataset)
}

/// Plain and trajectory variants: one forward call per batch.
pub fn train_single_pass<B, M>(
    model:    M,
    loader:   &dyn DataLoader<FrameBatch<B>>,
    settings: &LoopSettings,
    metrics:  Option<&MetricsLogger>,
) -> Result<(M, Vec<EpochMetrics>)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequencePredictor<B>,
{
    train_loop(model, loader, settings, metrics, |model, batch| {
        Ok((model.predict(batch.inputs)?, batch.targets))
    })
}

/// Autoregressive-shot variants: the loop unrolls over `frames`.
pub fn train_shot_unrolled<B: AutodiffBackend>(
    model:    ShotPredictor<B>,
    loader:   &dyn DataLoader<FrameBatch<B>>,
    settings: &LoopSettings,
    metrics:  Option<&MetricsLogger>,
    frames:   usize,
    mode:     ShotMode,
) -> Result<(ShotPredictor<B>, Vec<EpochMetrics>)> {
    train_loop(model, loader, settings, metrics, |model, batch| {
        Ok((unroll_shot(model, batch.inputs, frames, mode)?, batch.targets))
    })
}

/// Shared epoch/batch skeleton. `forward` returns (prediction, target).
pub fn train_loop<B, M, F>(
    mut model:   M,
    loader:      &dyn DataLoader<FrameBatch<B>>,
    settings:    &LoopSettings,
    metrics:     Option<&MetricsLogger>,
    mut forward: F,
) -> Result<(M, Vec<EpochMetrics>)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    F: FnMut(&M, FrameBatch<B>) -> Result<(Tensor<B, 4>, Tensor<B, 4>), ShapeError>,
{
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().init::<B, M>();

    let log_every = settings.log_every.max(1);
    let mut history   = Vec::with_capacity(settings.epochs);

    for epoch in 1..=settings.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for (batch_idx, batch) in loader.iter().enumerate() {
            let (prediction, target) = forward(&model, batch)?;
            let loss = mse_loss(prediction, target)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(settings.lr, model, grads);

            if (batch_idx + 1) % log_every == 0 {
                println!(
                    "Epoch [{}/{}], Step [{}/{}], Loss: {:.4}",
                    epoch, settings.epochs, batch_idx + 1, settings.batches_per_epoch, loss_val,
                );
            }
        }

        let avg_loss = if batches > 0 { loss_sum / batches as f64 } else { 0.0 };
        println!("Epoch [{}/{}], Average Loss: {:.4}", epoch, settings.epochs, avg_loss);

        let record = EpochMetrics::new(epoch, avg_loss, batches);
        if let Some(logger) = metrics {
            logger.log(&record)?;
        }
        history.push(record);
    }

    Ok((model, history))
}

/// Mean squared error over every element, after checking both shapes agree.
pub fn mse_loss<B: Backend>(prediction: Tensor<B, 4>, target: Tensor<B, 4>) -> Result<Tensor<B, 1>, ShapeError> {
    Shape4::from_dims(target.dims()).check("prediction vs target", prediction.dims())?;
    Ok(MseLoss::new().forward(prediction, target, Reduction::Mean))
}

/// Run the shot predictor once per frame, feeding each step's first output
/// channel back in as the next input and storing it in the prediction buffer.
///
/// inputs: [batch, in_channels, shots, samples] → [batch, frames, shots, samples]
pub fn unroll_shot<B: Backend>(
    model:  &ShotPredictor<B>,
    inputs: Tensor<B, 4>,
    frames: usize,
    mode:   ShotMode,
) -> Result<Tensor<B, 4>, ShapeError> {
    let [batch, _, shots, samples] = inputs.dims();
    let mut predictions = Tensor::<B, 4>::zeros([batch, frames, shots, samples], &inputs.device());

    let mut current = inputs;
    let mut memory  = None;

    for t in 0..frames {
        let step  = model.step(current, memory)?;
        let frame = step.output.slice([0..batch, 0..1, 0..shots, 0..samples]);
        predictions = write_frame(predictions, t, frame.clone())?;

        // The encoder expects in_channels planes; replicate the fed-back frame
        current = Tensor::cat(vec![frame; model.in_channels], 1);
        memory = match mode {
            ShotMode::LastFrame    => None,
            ShotMode::Accumulating => Some(step.memory),
        };
    }

    Ok(predictions)
}

/// Store a [batch, 1, shots, samples] frame at `index` of the buffer.
pub fn write_frame<B: Backend>(
    buffer: Tensor<B, 4>,
    index:  usize,
    frame:  Tensor<B, 4>,
) -> Result<Tensor<B, 4>, ShapeError> {
    let [batch, frames, shots, samples] = buffer.dims();
    if index >= frames {
        return Err(ShapeError::FrameOutOfRange { index, frames });
    }
    Shape4::new(batch, 1, shots, samples).check("predicted frame", frame.dims())?;
    Ok(buffer.slice_assign([0..batch, index..index + 1, 0..shots, 0..samples], frame))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::generate_dummy_data;
    use crate::domain::dims::SequenceDims;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::Distribution;

    type TestBackend         = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn tiny_dims() -> SequenceDims {
        SequenceDims {
            frames:       3,
            shots:        2,
            samples:      4,
            in_channels:  1,
            out_channels: 2,
            feature_dim:  8,
        }
    }

    fn tiny_config(variant: TrainingVariant, output_dir: &str) -> TrainConfig {
        TrainConfig {
            dims:             tiny_dims(),
            variant,
            epochs:           1,
            batch_size:       2,
            num_samples:      4,
            lr:               1e-3,
            seed:             7,
            log_every:        1,
            output_dir:       output_dir.to_string(),
            model_name:       "test_model".to_string(),
            trajectory_heads: 2,
            shot_heads:       2,
            num_layers:       1,
            d_ff:             8,
            dropout:          0.0,
            num_workers:      0,
        }
    }

    fn dataset_for(cfg: &TrainConfig, count: usize) -> FrameDataset {
        let target  = cfg.target_shape();
        let samples = generate_dummy_data(count, &cfg.dims, target.depth, cfg.seed);
        FrameDataset::new(samples, cfg.dims.input_shape(1), target)
    }

    fn settings(epochs: usize, batches: usize) -> LoopSettings {
        LoopSettings { epochs, lr: 1e-3, log_every: 10, batches_per_epoch: batches }
    }

    #[test]
    fn test_unroll_shot_fills_every_frame() {
        let cfg = tiny_config(TrainingVariant::Shot, ".");
        let model = shot_config(&cfg).init::<TestBackend>(&Default::default()).unwrap();
        let inputs = Tensor::<TestBackend, 4>::random([2, 1, 2, 4], Distribution::Default, &Default::default());

        for mode in [ShotMode::LastFrame, ShotMode::Accumulating] {
            let out = unroll_shot(&model, inputs.clone(), 3, mode).unwrap();
            assert_eq!(out.dims(), [2, 3, 2, 4]);
        }
    }

    #[test]
    fn test_unroll_shot_with_multi_channel_input() {
        let cfg = TrainConfig {
            dims: SequenceDims { in_channels: 3, ..tiny_dims() },
            ..tiny_config(TrainingVariant::Shot, ".")
        };
        let model = shot_config(&cfg).init::<TestBackend>(&Default::default()).unwrap();
        let inputs = Tensor::<TestBackend, 4>::random([1, 3, 2, 4], Distribution::Default, &Default::default());
        let out = unroll_shot(&model, inputs, 2, ShotMode::LastFrame).unwrap();
        assert_eq!(out.dims(), [1, 2, 2, 4]);
    }

    fn frame_values(t: Tensor<TestBackend, 4>, index: usize) -> Vec<f32> {
        let [batch, _, shots, samples] = t.dims();
        t.slice([0..batch, index..index + 1, 0..shots, 0..samples])
            .into_data()
            .to_vec::<f32>()
            .unwrap()
    }

    fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_unroll_shot_feeds_each_frame_into_the_next() {
        let cfg = tiny_config(TrainingVariant::Shot, ".");
        let model = shot_config(&cfg).init::<TestBackend>(&Default::default()).unwrap();
        let inputs = Tensor::<TestBackend, 4>::random([2, 1, 2, 4], Distribution::Default, &Default::default());

        let out = unroll_shot(&model, inputs.clone(), 3, ShotMode::LastFrame).unwrap();

        // Frame 0 is channel 0 of a single call on the raw input
        let first = model.forward(inputs.clone()).unwrap();
        let diff0 = max_abs_diff(&frame_values(out.clone(), 0), &frame_values(first, 0));
        assert!(diff0 < 1e-5, "frame 0 differs by {diff0}");

        // Frame 1 is channel 0 of a call on frame 0
        let frame0 = out.clone().slice([0..2, 0..1, 0..2, 0..4]);
        let second = model.forward(frame0).unwrap();
        let diff1 = max_abs_diff(&frame_values(out.clone(), 1), &frame_values(second, 0));
        assert!(diff1 < 1e-5, "frame 1 differs by {diff1}");

        // Attending over earlier frames changes later predictions
        let acc = unroll_shot(&model, inputs, 3, ShotMode::Accumulating).unwrap();
        let diff2 = max_abs_diff(&frame_values(out, 2), &frame_values(acc, 2));
        assert!(diff2 > 1e-6, "accumulating frame 2 matches last-frame mode");
    }

    #[test]
    fn test_write_frame_rejects_out_of_range_index() {
        let device = Default::default();
        let buffer = Tensor::<TestBackend, 4>::zeros([1, 2, 2, 2], &device);
        let frame  = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], &device);

        let err = write_frame(buffer.clone(), 2, frame.clone()).unwrap_err();
        assert_eq!(err, ShapeError::FrameOutOfRange { index: 2, frames: 2 });

        let written = write_frame(buffer, 1, frame).unwrap();
        let total: f32 = written.sum().into_scalar();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_mse_loss_checks_shapes() {
        let device = Default::default();
        let a = Tensor::<TestBackend, 4>::zeros([1, 2, 2, 2], &device);
        let b = Tensor::<TestBackend, 4>::ones([1, 2, 2, 2], &device);
        let loss: f32 = mse_loss(a.clone(), b).unwrap().into_scalar();
        assert!((loss - 1.0).abs() < 1e-6);

        let c = Tensor::<TestBackend, 4>::ones([1, 3, 2, 2], &device);
        assert!(mse_loss(a, c).is_err());
    }

    #[test]
    fn test_one_epoch_gives_finite_non_negative_loss() {
        let cfg     = tiny_config(TrainingVariant::Trajectory, ".");
        let device  = Default::default();
        let dataset = dataset_for(&cfg, 4);
        let loader  = build_loader::<TestAutodiffBackend>(&cfg, dataset, &device);
        let model   = trajectory_config(&cfg).init::<TestAutodiffBackend>(&device).unwrap();

        let (_, history) = train_single_pass(model, loader.as_ref(), &settings(1, 2), None).unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].batches, 2);
        assert!(history[0].avg_loss.is_finite());
        assert!(history[0].avg_loss >= 0.0);
    }

    #[test]
    fn test_zero_batches_leave_parameters_unchanged() {
        let cfg     = tiny_config(TrainingVariant::Plain, ".");
        let device  = Default::default();
        let dataset = dataset_for(&cfg, 0);
        let loader  = build_loader::<TestAutodiffBackend>(&cfg, dataset, &device);
        let model   = shot_config(&cfg).init::<TestAutodiffBackend>(&device).unwrap();
        let before  = model.encoder.weight.val().into_data().to_vec::<f32>().unwrap();

        let (model, history) = train_single_pass(model, loader.as_ref(), &settings(2, 0), None).unwrap();

        let after = model.encoder.weight.val().into_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|m| m.batches == 0 && m.avg_loss == 0.0));
    }

    #[test]
    fn test_mismatched_target_depth_is_an_error() {
        // Plain-loop targets (depth = out_channels) fed to the trajectory model
        let plain   = tiny_config(TrainingVariant::Plain, ".");
        let device  = Default::default();
        let dataset = dataset_for(&plain, 2);
        let loader  = build_loader::<TestAutodiffBackend>(&plain, dataset, &device);
        let model   = trajectory_config(&plain).init::<TestAutodiffBackend>(&device).unwrap();

        let result = train_single_pass(model, loader.as_ref(), &settings(1, 1), None);
        let err = result.err().expect("depth mismatch must fail");
        assert!(err.to_string().contains("prediction vs target"));
    }

    #[test]
    fn test_every_variant_trains_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().to_str().unwrap();
        let device = Default::default();

        for variant in TrainingVariant::ALL {
            let cfg  = tiny_config(variant, out);
            let ckpt = CheckpointManager::new(&cfg.output_dir, &format!("{variant}_model")).unwrap();
            let summary = train_on_device::<TestAutodiffBackend>(
                &cfg, dataset_for(&cfg, 4), &ckpt, &device,
            ).unwrap();

            assert_eq!(summary.history.len(), 1, "{variant}");
            assert!(summary.history[0].avg_loss.is_finite(), "{variant}");
            assert!(summary.checkpoint.exists(), "{variant}: {:?}", summary.checkpoint);
            assert!(summary.metrics.ends_with("metrics.csv"), "{variant}");
        }
    }
}
