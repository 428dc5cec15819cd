use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0}")]
    Validation(String),

    #[error("{field} is not valid JSON: {source}")]
    InvalidJson {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("the transcript is empty")]
    EmptyTranscript,

    #[error("no valid steps found in the transcript")]
    NoValidSteps,

    #[error("recording '{0}' not found")]
    NotFound(String),

    /// Two names that map to the same file on disk.
    #[error("recording '{name}' would overwrite '{existing}' (both are stored as {file})")]
    NameCollision {
        name: String,
        existing: String,
        file: String,
    },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize recording: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ControllerError>;
