//! Error types for Konkord

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KonkordError {
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Annotation error: {0}")]
    Annotation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for KonkordError {
    fn from(e: rusqlite::Error) -> Self {
        KonkordError::Database(e.to_string())
    }
}

impl serde::Serialize for KonkordError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
