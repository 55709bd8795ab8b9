//! Error types for stats aggregation

use thiserror::Error;

use crate::encounter::ProcessError;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("fight lock poisoned (selection position {position})")]
    FightLockPoisoned { position: usize },

    #[error("stats generation panicked: {message}")]
    Panicked { message: String },

    #[error(transparent)]
    Process(#[from] ProcessError),
}
