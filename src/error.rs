use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two compared tables a column or row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Portal,
    Omni,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Portal => "Portal",
            Side::Omni => "Omni",
        }
    }

    /// Suffix appended to a column name selected from both tables.
    pub fn suffix(self) -> &'static str {
        match self {
            Side::Portal => "_Portal",
            Side::Omni => "_Omni",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal conditions of a comparison run. Per-row and per-cell anomalies never
/// surface here; they are absorbed into the status taxonomy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompareError {
    #[error("No identifier column selected for the {0} table")]
    MissingIdentifier(Side),
    #[error("Column '{column}' not found in the {side} table")]
    UnknownColumn { side: Side, column: String },
    #[error("No comparison pairs selected; add at least one Portal/Omni price pair")]
    NoPairs,
    #[error("Comparison pair labels cannot be empty")]
    EmptyLabel,
    #[error("Comparison pair label '{0}' is used more than once")]
    DuplicateLabel(String),
    #[error("None of the comparison pairs could be resolved against the input tables")]
    NoResolvablePairs,
    #[error("Inner join produced no matching rows; check the identifier column selection")]
    EmptyJoin,
    #[error("No comparison pair labelled '{0}' in this run")]
    UnknownPair(String),
}
