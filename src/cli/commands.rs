// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// Every flag has a default, so running the binary with no
// arguments trains the trajectory variant on synthetic data
// and writes ./basic_transformer_model.mpk.gz.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;

use crate::application::train_use_case::TrainConfig;
use crate::domain::{dims::SequenceDims, variant::TrainingVariant};

/// All arguments for a training run.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training loop: plain, trajectory, shot or shot-accumulating
    #[arg(long, default_value_t = TrainingVariant::Trajectory)]
    pub variant: TrainingVariant,

    /// Number of full passes through the synthetic dataset
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Samples per batch (defaults to the frame count)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Number of synthetic samples to generate
    #[arg(long, default_value_t = 1000)]
    pub num_samples: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Seed for data generation and shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Print the running loss every N batches
    #[arg(long, default_value_t = 10)]
    pub log_every: usize,

    /// Directory for weights, config and metrics
    #[arg(long, default_value = ".")]
    pub output_dir: String,

    /// File stem of the saved parameters
    #[arg(long, default_value = "basic_transformer_model")]
    pub model_name: String,

    /// Frames per sequence (prediction horizon)
    #[arg(long, default_value_t = 8)]
    pub frames: usize,

    /// Shots per frame
    #[arg(long, default_value_t = 8)]
    pub shots: usize,

    /// Readout samples per shot
    #[arg(long, default_value_t = 64)]
    pub samples: usize,

    #[arg(long, default_value_t = 1)]
    pub in_channels: usize,

    #[arg(long, default_value_t = 2)]
    pub out_channels: usize,

    /// Pooled feature width inside the trajectory attention
    #[arg(long, default_value_t = 64)]
    pub feature_dim: usize,

    /// Attention heads of the trajectory predictor (must divide feature_dim)
    #[arg(long, default_value_t = 4)]
    pub trajectory_heads: usize,

    /// Attention heads of the shot predictor (must divide samples × out_channels)
    #[arg(long, default_value_t = 4)]
    pub shot_heads: usize,

    /// Encoder and decoder layers in each attention stage
    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner width of the attention feed-forward blocks
    #[arg(long, default_value_t = 2048)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Data loader worker threads (0 loads batches on the training thread)
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        let dims = SequenceDims {
            frames:       a.frames,
            shots:        a.shots,
            samples:      a.samples,
            in_channels:  a.in_channels,
            out_channels: a.out_channels,
            feature_dim:  a.feature_dim,
        };
        TrainConfig {
            dims,
            variant:          a.variant,
            epochs:           a.epochs,
            batch_size:       a.batch_size.unwrap_or(dims.frames),
            num_samples:      a.num_samples,
            lr:               a.lr,
            seed:             a.seed,
            log_every:        a.log_every,
            output_dir:       a.output_dir,
            model_name:       a.model_name,
            trajectory_heads: a.trajectory_heads,
            shot_heads:       a.shot_heads,
            num_layers:       a.num_layers,
            d_ff:             a.d_ff,
            dropout:          a.dropout,
            num_workers:      a.num_workers,
        }
    }
}
