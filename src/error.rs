use thiserror::Error;

use crate::runner::state::RunState;

/// Errors produced while talking to the reporter API
#[derive(Error, Debug)]
pub enum ReporterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Reporter API responded with HTTP {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Run duration must be a finite, non-negative number of seconds, got {0}")]
    InvalidDuration(f64),

    #[error("Test run is {state}, expected {expected}")]
    InvalidState { state: RunState, expected: RunState },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ReporterError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest embeds the full URL (api_key included) in its Display output
        let err = err.without_url();
        if err.is_timeout() {
            ReporterError::Transport(format!("request timed out: {}", err))
        } else {
            ReporterError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ReporterError>;
