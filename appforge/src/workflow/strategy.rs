//! Choice between one file per component and a single self-contained file

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::UiPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One artifact per component, healed and composed by a root container
    MultiArtifact,
    /// The whole interface in the root container file
    SingleArtifact,
}

impl Strategy {
    /// Pure function of the plan; anything unrecognized selects the multi-artifact strategy
    pub fn determine(plan: &UiPlan) -> Self {
        match plan
            .strategy
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .as_deref()
        {
            Some("single" | "single-file" | "single_file" | "single-artifact") => {
                Strategy::SingleArtifact
            }
            _ => Strategy::MultiArtifact,
        }
    }

    /// The chosen strategy, then the other one
    pub fn fallback_order(self) -> [Strategy; 2] {
        match self {
            Strategy::MultiArtifact => [Strategy::MultiArtifact, Strategy::SingleArtifact],
            Strategy::SingleArtifact => [Strategy::SingleArtifact, Strategy::MultiArtifact],
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::MultiArtifact => write!(f, "multi-artifact"),
            Strategy::SingleArtifact => write!(f, "single-artifact"),
        }
    }
}
