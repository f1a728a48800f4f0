use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrevUpdaterError {
    #[error("Resource not found")]
    NotFound,

    #[error("Bad request")]
    BadRequest,

    #[error("Internal server error")]
    InternalServer,

    #[error("Unrecognized API response (status {status})")]
    Unrecognized { status: u16 },

    #[error("No completed run found on a branch matching '{0}'")]
    BranchNotFound(String),

    #[error("No previous run found to compare with the last run on '{0}'")]
    NoPreviousRun(String),

    #[error("Parallel requests did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} operation(s) failed: {}", .0.len(), join_messages(.0))]
    Aggregate(Vec<PrevUpdaterError>),
}

impl PrevUpdaterError {
    /// Maps a non-success HTTP status onto the fixed error kinds.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => Self::BadRequest,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::INTERNAL_SERVER_ERROR => Self::InternalServer,
            other => Self::Unrecognized {
                status: other.as_u16(),
            },
        }
    }

    /// Joins collected failures into a single error, or `Ok` when there are none.
    pub fn join(errors: Vec<PrevUpdaterError>) -> Result<()> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::Aggregate(errors))
        }
    }
}

fn join_messages(errors: &[PrevUpdaterError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PrevUpdaterError>;
