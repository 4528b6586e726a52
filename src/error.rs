use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyTraceError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database Error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),

    #[error("Invalid pattern '{pattern}': expected exactly {expected} characters")]
    InvalidPattern { pattern: String, expected: usize },

    #[error("Unknown session mode '{0}'")]
    UnknownMode(String),

    #[error("Session {0} not found")]
    SessionNotFound(i64),

    #[error("Keystroke {0} not found")]
    KeystrokeNotFound(i64),

    #[error("Malformed record (session {session_id}, keystroke {keystroke_id:?}): {reason}")]
    MalformedRecord {
        session_id: i64,
        keystroke_id: Option<i64>,
        reason: String,
    },
}

pub type KtResult<T> = Result<T, KeyTraceError>;
