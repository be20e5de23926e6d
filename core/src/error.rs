use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown city '{name}'")]
    UnknownCity { name: String },

    #[error("Duplicate city '{name}' in city table")]
    DuplicateCity { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TrackResult<T> = Result<T, TrackError>;
