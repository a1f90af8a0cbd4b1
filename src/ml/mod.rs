// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn modules, losses and optimisers live here.
//
//   model.rs   — Seq2SeqAttention (transformer encoder + decoder)
//                TrajectoryPredictor:
//                  • Conv2d encoder → adaptive average pool
//                  • frames−1 attention steps growing a sequence
//                  • Linear projection back to shot × sample planes
//                ShotPredictor:
//                  • Conv2d encoder, one token per shot
//                  • attention in last-frame or accumulating mode
//
//   trainer.rs — The four training loops over one shared skeleton:
//                forward, MSE loss, backward, Adam step, logging,
//                and saving the parameters when the run ends.
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Trajectory and shot predictor architectures
pub mod model;

/// Training loops, loss and autoregressive unrolling
pub mod trainer;
