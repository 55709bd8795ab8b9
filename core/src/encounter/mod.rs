//! Fights: attribution of damage records, fight lifecycle and signals

pub mod classifier;
pub mod fight;
pub mod lifecycle;
pub mod processor;
pub mod signal;

mod error;
mod heal_log;


pub use classifier::{AttackClassifier, Attribution};
pub use error::ProcessError;
pub use fight::{
    Fight, FightSnapshot, FightTotalDamage, SharedFight, SpellDamageStats, create_record_key,
    format_begin_time,
};
pub use heal_log::HealLog;
pub use lifecycle::FightLifecycle;
pub use processor::FightProcessor;
pub use signal::{FightSignal, SignalHandler};
