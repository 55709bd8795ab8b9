//! Error types for the fight write path

use thiserror::Error;

/// Per-record failures. The record is dropped; processing continues.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("fight lock poisoned: {name}")]
    FightLockPoisoned { name: String },

    #[error("fight {name} expired and no successor could be opened")]
    FightExpired { name: String },

    #[error("heal log lock poisoned")]
    HealLogPoisoned,

    #[error("negative amount {total} at line {line_number}")]
    NegativeAmount { line_number: u64, total: i64 },

    #[error("timestamp {timestamp} at line {line_number} is before {last}")]
    OutOfOrder {
        line_number: u64,
        timestamp: f64,
        last: f64,
    },
}
