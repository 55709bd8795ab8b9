//! Error types for context operations

use std::path::PathBuf;
use thiserror::Error;

use crate::combat_log::ReaderError;

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] confy::ConfyError),

    #[error("failed to save configuration")]
    Save(#[source] confy::ConfyError),

    #[error("failed to locate configuration file")]
    Locate(#[source] confy::ConfyError),

    #[error("unknown setting '{key}'")]
    UnknownKey { key: String },

    #[error("invalid value '{value}' for setting '{key}'")]
    InvalidValue { key: String, value: String },
}

/// Errors while feeding record files through the writer workers
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to read record file")]
    Reader(#[from] ReaderError),

    #[error("record file {path} was not found")]
    NotFound { path: PathBuf },

    #[error("writer for source '{source_name}' has stopped")]
    WorkerClosed { source_name: String },

    #[error("background task failed")]
    Join(#[from] tokio::task::JoinError),
}
