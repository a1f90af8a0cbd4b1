// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records the average training loss to a CSV file after each
// epoch, next to the saved weights.
//
// Metrics recorded per epoch:
//   - epoch:    the epoch number (1, 2, 3, ...)
//   - avg_loss: mean MSE over the epoch's batches
//   - batches:  how many optimiser steps ran
//
// Output file: {output_dir}/metrics.csv
//
// Example CSV output:
//   epoch,avg_loss,batches
//   1,0.164210,125
//   2,0.083517,125
//   ...

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean of the per-batch MSE values; 0.0 when no batch ran
    pub avg_loss: f64,

    /// Number of batches (and optimiser steps) in the epoch
    pub batches: usize,
}

impl EpochMetrics {
    pub fn new(epoch: usize, avg_loss: f64, batches: usize) -> Self {
        Self { epoch, avg_loss, batches }
    }
}

/// Appends epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");

        // Appending across runs keeps the header from the first one
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,avg_loss,batches")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(f, "{},{:.6},{}", m.epoch, m.avg_loss, m.batches)?;

        tracing::debug!(
            "Logged epoch {} metrics: avg_loss={:.4}, batches={}",
            m.epoch,
            m.avg_loss,
            m.batches,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_are_appended_after_header() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path().to_str().unwrap()).unwrap();

        logger.log(&EpochMetrics::new(1, 0.25, 4)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.125, 4)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "epoch,avg_loss,batches",
            "1,0.250000,4",
            "2,0.125000,4",
        ]);
    }

    #[test]
    fn test_header_is_written_once() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();

        MetricsLogger::new(path).unwrap().log(&EpochMetrics::new(1, 1.0, 1)).unwrap();
        let again = MetricsLogger::new(path).unwrap();

        let text = fs::read_to_string(again.csv_path()).unwrap();
        assert_eq!(text.matches("epoch,avg_loss,batches").count(), 1);
        assert_eq!(text.lines().count(), 2);
    }
}
