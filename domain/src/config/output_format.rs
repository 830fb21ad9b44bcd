//! Output format value object

use serde::{Deserialize, Serialize};

/// How a finished (or paused) pipeline run is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every stage: snapshot, gaps, problems, solutions, agent, results, learning
    Full,
    /// Gaps, the approved solution and the execution outcome
    #[default]
    Summary,
    /// The persisted run record as JSON
    Json,
}
