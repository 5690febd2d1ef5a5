//! Classified failures of the acquisition pipeline.
//!
//! Most code passes `anyhow::Error` around; these variants exist for the
//! places where a caller needs to tell failures apart (the HTTP server,
//! and the fallthrough log lines of the resolver).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WisdomError {
    #[error("source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid day {day}: must be between 1 and {max}")]
    InvalidDay { day: u32, max: u32 },
}

impl WisdomError {
    pub fn source_unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        WisdomError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn generation(reason: impl Into<String>) -> Self {
        WisdomError::Generation(reason.into())
    }

    /// Machine-readable code for HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            WisdomError::SourceUnavailable { .. } => "source_unavailable",
            WisdomError::Generation(_) => "generation_failed",
            WisdomError::InvalidDay { .. } => "bad_request",
        }
    }
}
