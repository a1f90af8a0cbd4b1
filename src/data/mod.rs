// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "no data yet" and tensor batches:
//
//   generate_dummy_data  → uniform [0, 1) inputs and targets
//       │
//       ▼
//   FrameDataset         → implements Burn's Dataset trait
//       │
//       ▼
//   FrameBatcher         → stacks samples into 4-D tensors
//       │
//       ▼
//   DataLoader           → feeds shuffled batches to the loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Random input/target generation
pub mod synthetic;

/// Implements Burn's Dataset trait for frame samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
