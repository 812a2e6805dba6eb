use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error)]
pub enum GenomeGraphError {
    #[error("file access failure: {0}")]
    FileAccess(String),
    #[error("unknown format: {0}")]
    UnknownFormat(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("parse aborted: {0}")]
    Aborted(String),
}

impl GenomeGraphError {
    pub fn file_access<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::FileAccess(msg.into())
    }

    pub fn unknown_format<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::UnknownFormat(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::NotFound(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::QueryError(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::InvalidInput(msg.into())
    }

    pub fn aborted<T: Into<String>>(msg: T) -> Self {
        GenomeGraphError::Aborted(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GenomeGraphError::NotFound(_))
    }
}
