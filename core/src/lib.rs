pub mod combat_log;
pub mod context;
pub mod encounter;
pub mod players;
pub mod stats;
pub mod timeline;

// Re-exports for convenience
pub use combat_log::*;
pub use context::{AppConfig, AppConfigExt, AppContext, FightSelector, IStr, LoadSummary, intern, resolve};
pub use encounter::{
    AttackClassifier, Attribution, Fight, FightLifecycle, FightProcessor, FightSignal, FightSnapshot, HealLog,
    ProcessError, SharedFight, SignalHandler,
};
pub use players::PlayerRegistry;
pub use stats::{
    CombinedStats, GenerationState, PlayerStats, PlayerSubStats, StatsAggregationEngine, StatsError,
    StatsGenerationEvent, StatsOutcome,
};
pub use timeline::{TimeRange, TimeSegment};
