// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Validate the configuration   (Layer 3 - domain)
//   Step 2: Generate synthetic samples   (Layer 4 - data)
//   Step 3: Build the Burn dataset       (Layer 4 - data)
//   Step 4: Save config next to weights  (Layer 6 - infra)
//   Step 5: Train and save parameters    (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::data::{dataset::FrameDataset, synthetic::generate_dummy_data};
use crate::domain::{
    dims::{Shape4, SequenceDims},
    variant::TrainingVariant,
};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::trainer::{run_training, train_on_device, TrainingSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs, serialisable so the exact settings are
// stored next to the weights they produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dims:             SequenceDims,
    pub variant:          TrainingVariant,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub num_samples:      usize,
    pub lr:               f64,
    pub seed:             u64,
    pub log_every:        usize,
    pub output_dir:       String,
    pub model_name:       String,
    pub trajectory_heads: usize,
    pub shot_heads:       usize,
    pub num_layers:       usize,
    pub d_ff:             usize,
    pub dropout:          f64,
    pub num_workers:      usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let dims = SequenceDims::default();
        Self {
            dims,
            variant:          TrainingVariant::default(),
            epochs:           10,
            // One batch holds as many samples as a sequence has frames
            batch_size:       dims.frames,
            num_samples:      1000,
            lr:               1e-3,
            seed:             42,
            log_every:        10,
            output_dir:       ".".to_string(),
            model_name:       "basic_transformer_model".to_string(),
            trajectory_heads: 4,
            shot_heads:       4,
            num_layers:       6,
            d_ff:             2048,
            dropout:          0.1,
            num_workers:      1,
        }
    }
}

impl TrainConfig {
    /// Catch bad settings before any tensor is allocated.
    pub fn validate(&self) -> Result<()> {
        self.dims.validate()?;
        ensure!(self.batch_size > 0, "batch_size must be greater than zero");
        ensure!(self.log_every > 0,  "log_every must be greater than zero");
        ensure!(self.lr.is_finite() && self.lr > 0.0, "lr must be a positive number, got {}", self.lr);
        ensure!(
            (0.0..1.0).contains(&self.dropout),
            "dropout must be in [0, 1), got {}", self.dropout
        );
        ensure!(!self.model_name.is_empty(), "model_name must not be empty");
        Ok(())
    }

    /// Per-sample target shape for the configured variant
    pub fn target_shape(&self) -> Shape4 {
        let depth = self.variant.target_depth(&self.dims);
        Shape4::new(1, depth, self.dims.shots, self.dims.samples)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the default WGPU device.
    pub fn execute(&self) -> Result<TrainingSummary> {
        let (dataset, ckpt_manager) = self.prepare()?;
        run_training(&self.config, dataset, &ckpt_manager)
    }

    /// Run on an explicit backend and device.
    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainingSummary> {
        let (dataset, ckpt_manager) = self.prepare()?;
        train_on_device::<B>(&self.config, dataset, &ckpt_manager, device)
    }

    fn prepare(&self) -> Result<(FrameDataset, CheckpointManager)> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Synthetic samples ─────────────────────────────────────────
        let target_shape = cfg.target_shape();
        let samples = generate_dummy_data(cfg.num_samples, &cfg.dims, target_shape.depth, cfg.seed);
        tracing::info!(
            "Generated {} synthetic samples (input {}, target {})",
            samples.len(),
            cfg.dims.input_shape(1),
            target_shape,
        );

        // ── Step 3: Burn dataset ──────────────────────────────────────────────
        let dataset = FrameDataset::new(samples, cfg.dims.input_shape(1), target_shape);

        // ── Step 4: Save config ───────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.output_dir, &cfg.model_name)?;
        ckpt_manager.save_config(cfg)?;

        Ok((dataset, ckpt_manager))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.batch_size, cfg.dims.frames);
        assert_eq!(cfg.variant, TrainingVariant::Trajectory);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let zero_batch = TrainConfig { batch_size: 0, ..TrainConfig::default() };
        assert!(zero_batch.validate().is_err());

        let bad_lr = TrainConfig { lr: f64::NAN, ..TrainConfig::default() };
        assert!(bad_lr.validate().is_err());

        let bad_dims = TrainConfig {
            dims: SequenceDims { frames: 0, ..SequenceDims::default() },
            ..TrainConfig::default()
        };
        assert!(bad_dims.validate().is_err());
    }

    #[test]
    fn test_plain_target_uses_out_channels() {
        let cfg = TrainConfig { variant: TrainingVariant::Plain, ..TrainConfig::default() };
        assert_eq!(cfg.target_shape().dims(), [1, 2, 8, 64]);
    }

    #[test]
    fn test_execute_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            dims: SequenceDims {
                frames:       2,
                shots:        2,
                samples:      4,
                in_channels:  1,
                out_channels: 2,
                feature_dim:  8,
            },
            epochs:           2,
            batch_size:       2,
            num_samples:      3,
            output_dir:       dir.path().to_str().unwrap().to_string(),
            trajectory_heads: 2,
            shot_heads:       2,
            num_layers:       1,
            d_ff:             8,
            num_workers:      0,
            ..TrainConfig::default()
        };

        let summary = TrainUseCase::new(cfg)
            .execute_on::<Autodiff<NdArray>>(&Default::default())
            .unwrap();

        // 3 samples in batches of 2 → 2 batches per epoch
        assert_eq!(summary.history.len(), 2);
        assert!(summary.history.iter().all(|m| m.batches == 2));

        let out = dir.path();
        assert!(out.join("basic_transformer_model.mpk.gz").exists());
        assert!(out.join("train_config.json").exists());
        assert_eq!(summary.metrics, out.join("metrics.csv"));
        let csv = std::fs::read_to_string(&summary.metrics).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }
}
