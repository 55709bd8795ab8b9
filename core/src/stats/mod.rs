//! Per-player statistics over a selection of fights

pub mod calc;
mod engine;
mod error;
mod generation;
mod player_stats;
mod report;
mod validator;

#[cfg(test)]
mod engine_tests;

pub use engine::{StatsAggregationEngine, StatsGroups};
pub use error::StatsError;
pub use generation::{GenerationState, StatsGenerationEvent, StatsOutcome};
pub use player_stats::{PlayerStats, PlayerSubStats};
pub use report::{CombinedStats, StatsAction};
pub use validator::{DamageValidator, Verdict};
