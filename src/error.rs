use crate::session::ValidationErrors;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Task {id} no longer exists")]
    StaleReference { id: u64 },

    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("A save is already in progress")]
    SubmitInFlight,

    #[error("Task {id} is finished and cannot be edited")]
    NotEditable { id: u64 },

    #[error("Task {id} is already finished")]
    AlreadyFinished { id: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Errors produced by a call to the remote store, as opposed to ones
    /// rejected locally before any call was made.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::Http(_)
                | AppError::Remote { .. }
                | AppError::StaleReference { .. }
                | AppError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
