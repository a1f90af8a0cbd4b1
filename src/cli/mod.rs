// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses flags with clap and hands a TrainConfig to Layer 2.
// This layer only routes and prints; it never computes.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::train_use_case::TrainUseCase;

#[derive(Parser, Debug)]
#[command(
    name = "mri-seq-transformer",
    version,
    about = "Train a transformer to predict MRI frame/shot sequences on synthetic data."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        tracing::info!("Starting '{}' training run", self.train.variant);

        let use_case = TrainUseCase::new(self.train.into());
        let summary  = use_case.execute()?;

        if let Some(last) = summary.history.last() {
            tracing::info!("Final average loss {:.4} after epoch {}", last.avg_loss, last.epoch);
        }
        tracing::info!("Parameters written to '{}'", summary.checkpoint.display());
        tracing::info!("Epoch losses written to '{}'", summary.metrics.display());
        println!("Training complete. Model saved.");
        Ok(())
    }
}
