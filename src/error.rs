use thiserror::Error;

/// Errors surfaced by the reminder engine and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("notification subsystem error: {0}")]
    Notifier(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("invalid dose time '{0}': expected HH:MM")]
    InvalidTime(String),

    #[error("invalid medication: {0}")]
    InvalidMedication(String),

    #[error("medication '{0}' not found")]
    MedicationNotFound(String),
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
