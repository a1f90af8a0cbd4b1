// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves model parameters using Burn's named MessagePack file
// recorder (gzip-compressed, full f32 precision).
//
// What gets saved per run:
//   1. Model weights ({model_name}.mpk.gz) — every learned parameter,
//      keyed by its module path (e.g. encoder.weight)
//   2. train_config.json — the configuration that produced them
//
// Full precision rather than the half-precision CompactRecorder,
// so a save/load round trip returns bit-identical weights.
//
// File layout:
//   {output_dir}/
//     basic_transformer_model.mpk.gz
//     train_config.json
//     metrics.csv                      (written by MetricsLogger)
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;

type ParamRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Extension the recorder appends to the model path
const RECORD_EXTENSION: &str = "mpk.gz";

pub struct CheckpointManager {
    dir:        PathBuf,
    model_name: String,
}

impl CheckpointManager {
    /// Create the output directory (like `mkdir -p`) and remember the model name.
    pub fn new(dir: impl Into<String>, model_name: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir, model_name: model_name.into() })
    }

    /// Path of the saved parameter file, extension included.
    pub fn model_file(&self) -> PathBuf {
        self.dir.join(format!("{}.{RECORD_EXTENSION}", self.model_name))
    }

    /// Serialise every parameter of `model` and return the written file.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<PathBuf> {
        // Without extension — the recorder adds it
        let path = self.dir.join(&self.model_name);

        <ParamRecorder as Recorder<B>>::record(&ParamRecorder::new(), model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let file = self.model_file();
        tracing::info!("Saved model parameters to '{}'", file.display());
        Ok(file)
    }

    /// Restore parameters written by `save_model` into a model of the same
    /// architecture.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let path = self.dir.join(&self.model_name);

        let record = <ParamRecorder as Recorder<B>>::load(&ParamRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load model from '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    /// Write the run configuration next to the weights.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<PathBuf> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(path)
    }
}
