use std::sync::Arc;

use fightlog_types::StatsDimension;

use super::report::CombinedStats;

/// Phase of one stats request, in publication order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Started,
    Completed,
    /// The selection had no blocks (or none inside the window)
    NoData,
    /// Nothing was selected
    NoNpc,
    Failed,
}

/// Published on the engine's broadcast channel.
#[derive(Debug, Clone)]
pub struct StatsGenerationEvent {
    pub dimension: StatsDimension,
    pub state: GenerationState,
    pub combined: Option<Arc<CombinedStats>>,
    pub limited: bool,
    pub unique_group_count: usize,
    pub error: Option<String>,
}

impl StatsGenerationEvent {
    pub(crate) fn new(dimension: StatsDimension, state: GenerationState) -> Self {
        Self {
            dimension,
            state,
            combined: None,
            limited: false,
            unique_group_count: 0,
            error: None,
        }
    }

    pub(crate) fn completed(combined: Arc<CombinedStats>) -> Self {
        Self {
            dimension: combined.dimension,
            state: GenerationState::Completed,
            limited: combined.limited,
            unique_group_count: combined.unique_group_count,
            combined: Some(combined),
            error: None,
        }
    }

    pub(crate) fn failed(dimension: StatsDimension, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(dimension, GenerationState::Failed)
        }
    }
}

/// Result of a `build` or `rebuild` call.
#[derive(Debug, Clone)]
pub enum StatsOutcome {
    Completed(Arc<CombinedStats>),
    NoData,
    NoNpc,
    /// A newer request started before this one finished; nothing was published
    Superseded,
    Failed(String),
}

impl StatsOutcome {
    pub fn stats(&self) -> Option<&Arc<CombinedStats>> {
        match self {
            StatsOutcome::Completed(stats) => Some(stats),
            _ => None,
        }
    }
}
