use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    /// Renamed, but the folder could not be resolved or the move was refused.
    Partial,
    Error,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: String,
    pub status: ExecutionStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub success: bool,
    pub results: Vec<ExecutionResult>,
    pub total: usize,
    pub successful: usize,
    pub partial: usize,
    pub failed: usize,
    pub deleted_folders: Vec<String>,
    pub batch_id: String,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub successful: usize,
    pub partial: usize,
    pub failed: usize,
}

pub fn tally(results: &[ExecutionResult]) -> StatusTally {
    results
        .iter()
        .fold(StatusTally::default(), |mut acc, result| {
            match result.status {
                ExecutionStatus::Success => acc.successful += 1,
                ExecutionStatus::Partial => acc.partial += 1,
                ExecutionStatus::Error => acc.failed += 1,
            }
            acc
        })
}
