//! Derive a training label for a PSM from the search engine's own verdict

use serde::Serialize;

use crate::peptide::IdentificationRecord;

pub const MASCOT_SCORE: &str = "Mascot:score";
pub const MASCOT_THRESHOLD: &str = "Mascot:identity threshold";
pub const SCAFFOLD_PROBABILITY: &str = "Scaffold:Peptide Probability";

/// Minimum Scaffold peptide probability for a positive label
pub const SCAFFOLD_CUTOFF: f64 = 0.99;

/// Which rule produced the label
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Mascot,
    Scaffold,
    Rank,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Mascot => "mascot",
            Decision::Scaffold => "scaffold",
            Decision::Rank => "rank",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassLabel {
    pub decision: Decision,
    pub label: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// No Mascot/Scaffold scores and no rank to fall back on
    Undetermined,
}

impl std::fmt::Display for LabelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelError::Undetermined => f.write_str("no score, probability or rank to label PSM"),
        }
    }
}

impl std::error::Error for LabelError {}

/// Fixed priority: Mascot identity threshold, then Scaffold probability,
/// then search engine rank.
pub fn class_label(identification: &IdentificationRecord) -> Result<ClassLabel, LabelError> {
    if let (Some(score), Some(threshold)) = (
        identification.parameter(MASCOT_SCORE),
        identification.parameter(MASCOT_THRESHOLD),
    ) {
        return Ok(ClassLabel {
            decision: Decision::Mascot,
            label: score > threshold,
        });
    }

    if let Some(probability) = identification.parameter(SCAFFOLD_PROBABILITY) {
        return Ok(ClassLabel {
            decision: Decision::Scaffold,
            label: probability >= SCAFFOLD_CUTOFF,
        });
    }

    match identification.rank {
        Some(rank) => Ok(ClassLabel {
            decision: Decision::Rank,
            label: rank == 1,
        }),
        None => Err(LabelError::Undetermined),
    }
}
