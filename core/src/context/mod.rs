//! Session context: configuration, interning and the services a front end
//! drives.

mod app_context;
mod background_tasks;
mod config;
mod error;
mod interner;

pub use app_context::{AppContext, FightSelector, LoadSummary};
pub use background_tasks::{BackgroundTasks, WriterMessage};
pub use config::{AppConfig, AppConfigExt, FightSettings, StatsDimension, ValidatorSettings};
pub use error::{ConfigError, ContextError};
pub use interner::{IStr, empty_istr, eq_ignore_case, intern, interner, resolve};
