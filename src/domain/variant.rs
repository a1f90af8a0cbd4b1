// ============================================================
// Layer 3 — Training Variants
// ============================================================
// All four loops share one skeleton (forward → MSE → backward →
// Adam step). They differ only in which model is built and how
// its forward pass is driven:
//
//   plain              shot predictor, one call per batch
//   trajectory         trajectory predictor, unrolls internally
//   shot               loop-level unroll, last-frame attention
//   shot-accumulating  loop-level unroll, attends over a memory
//                      of every encoded step so far

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::domain::dims::SequenceDims;

/// How the shot predictor picks its attention reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShotMode {
    /// The encoded sequence attends to itself
    LastFrame,
    /// The encoded sequence attends to the memory of all steps so far
    Accumulating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingVariant {
    Plain,
    #[default]
    Trajectory,
    Shot,
    ShotAccumulating,
}

impl TrainingVariant {
    pub const ALL: [TrainingVariant; 4] = [
        TrainingVariant::Plain,
        TrainingVariant::Trajectory,
        TrainingVariant::Shot,
        TrainingVariant::ShotAccumulating,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrainingVariant::Plain            => "plain",
            TrainingVariant::Trajectory       => "trajectory",
            TrainingVariant::Shot             => "shot",
            TrainingVariant::ShotAccumulating => "shot-accumulating",
        }
    }

    /// Depth of the target tensor this variant trains against.
    ///
    /// A single shot-predictor pass yields `out_channels` planes, so the
    /// plain loop regresses against that many frames; every other loop
    /// produces the full frame sequence.
    pub fn target_depth(&self, dims: &SequenceDims) -> usize {
        match self {
            TrainingVariant::Plain => dims.out_channels,
            _                      => dims.frames,
        }
    }

    /// Attention mode for the loop-level shot unroll, if this variant has one.
    pub fn shot_mode(&self) -> Option<ShotMode> {
        match self {
            TrainingVariant::Shot             => Some(ShotMode::LastFrame),
            TrainingVariant::ShotAccumulating => Some(ShotMode::Accumulating),
            _                                 => None,
        }
    }
}

impl fmt::Display for TrainingVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrainingVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|v| v.name()).collect();
                format!("unknown variant '{s}' (expected one of: {})", names.join(", "))
            })
    }
}
