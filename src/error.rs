use thiserror::Error;

/// Failures of the decode → correlate → build pipeline.
///
/// Every variant carries the datum that caused it so the caller can surface
/// it as-is. None of them are retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    #[error("No entry named {name:?} found")]
    NotFound { name: String },

    #[error("Malformed reference token: {value}")]
    MalformedReference { value: String },

    #[error("Reference index {index} out of range for {len} identifiers")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Encoding error in {token:?}: {reason}")]
    Encoding { token: String, reason: String },
}

impl MarshalError {
    pub fn encoding<T: Into<String>, R: ToString>(token: T, reason: R) -> Self {
        MarshalError::Encoding {
            token: token.into(),
            reason: reason.to_string(),
        }
    }
}

pub type MarshalResult<T> = Result<T, MarshalError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Marshal error: {0}")]
    Marshal(#[from] MarshalError),

    // collaborators
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Submit error: {0}")]
    Submit(String),

    #[error("Slog error: {0}")]
    Slog(String),

    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Error::Transport(message.into())
    }
}
