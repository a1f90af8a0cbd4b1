// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem:
//
//   checkpoint.rs — Saving (and, for verification, loading)
//                   model parameters with a Burn file recorder,
//                   plus the run configuration as JSON.
//
//   metrics.rs    — Per-epoch average loss appended to a CSV
//                   file for plotting learning curves.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model parameter and config persistence
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
