use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, oneshot};
use tracing::info;

use super::background_tasks::{BackgroundTasks, WriterMessage};
use super::config::{AppConfig, AppConfigExt, StatsDimension};
use super::error::ContextError;
use super::interner::resolve;
use crate::combat_log::{CombatEvent, Reader};
use crate::encounter::{FightLifecycle, FightProcessor, HealLog, SharedFight};
use crate::players::PlayerRegistry;
use crate::stats::{StatsAggregationEngine, StatsOutcome};

/// Which fights a report covers.
#[derive(Debug, Clone, PartialEq)]
pub enum FightSelector {
    /// Every fight of the session
    All,
    /// Fights still on the overlay list
    Overlay,
    Ids(Vec<i64>),
    /// Fights whose creature name matches, ignoring case
    Name(String),
    Group(i32),
}

/// Outcome of replaying one record file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub path: PathBuf,
    pub events: usize,
    pub parse_errors: usize,
    pub dropped: usize,
    pub bytes_read: u64,
    pub elapsed_ms: u128,
}

/// Owns every service of a session. Front ends hold one of these and pass it
/// around explicitly.
pub struct AppContext {
    config: AppConfig,
    registry: Arc<PlayerRegistry>,
    lifecycle: Arc<FightLifecycle>,
    heal_log: Arc<HealLog>,
    damage: Arc<StatsAggregationEngine>,
    tanking: Arc<StatsAggregationEngine>,
    healing: Arc<StatsAggregationEngine>,
    tasks: Mutex<BackgroundTasks>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        let registry = Arc::new(PlayerRegistry::new());
        let heal_log = Arc::new(HealLog::new());
        let lifecycle = Arc::new(FightLifecycle::new(
            config.fights.clone(),
            config.validator.clone(),
            config.signal_capacity,
        ));
        let engine = |dimension| {
            Arc::new(StatsAggregationEngine::new(
                dimension,
                Arc::clone(&registry),
                Arc::clone(&heal_log),
                config.validator.clone(),
                config.signal_capacity,
            ))
        };

        Self {
            damage: engine(StatsDimension::Damage),
            tanking: engine(StatsDimension::Tanking),
            healing: engine(StatsDimension::Healing),
            config,
            registry,
            lifecycle,
            heal_log,
            tasks: Mutex::new(BackgroundTasks::default()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &Arc<FightLifecycle> {
        &self.lifecycle
    }

    pub fn heal_log(&self) -> &Arc<HealLog> {
        &self.heal_log
    }

    pub fn engine(&self, dimension: StatsDimension) -> &Arc<StatsAggregationEngine> {
        match dimension {
            StatsDimension::Damage => &self.damage,
            StatsDimension::Tanking => &self.tanking,
            StatsDimension::Healing => &self.healing,
        }
    }

    pub async fn sources(&self) -> Vec<String> {
        self.tasks.lock().await.sources()
    }

    /// Queue events on the writer for `source` and wait until they are
    /// applied. Returns the number of dropped records.
    pub async fn submit(&self, source: &str, events: Vec<CombatEvent>) -> Result<usize, ContextError> {
        let sender = {
            let mut tasks = self.tasks.lock().await;
            tasks.writer(source, || {
                FightProcessor::new(
                    Arc::clone(&self.registry),
                    Arc::clone(&self.lifecycle),
                    Arc::clone(&self.heal_log),
                    &self.config.fights,
                )
            })
        };

        let closed = || ContextError::WorkerClosed {
            source_name: source.to_string(),
        };
        let (done, dropped) = oneshot::channel();
        sender
            .send(WriterMessage::Batch {
                events,
                done: Some(done),
            })
            .await
            .map_err(|_| closed())?;
        dropped.await.map_err(|_| closed())
    }

    /// Read a record file and replay it through its own writer.
    pub async fn load_file(&self, path: &Path) -> Result<LoadSummary, ContextError> {
        let timer = Instant::now();
        let path = self.config.resolve_record_path(path);
        if !path.is_file() {
            return Err(ContextError::NotFound { path });
        }

        let reader = Reader::from(path.clone());
        let result = tokio::task::spawn_blocking(move || reader.read_record_file()).await??;
        let events = result.events.len();
        let source = path.display().to_string();
        let dropped = self.submit(&source, result.events).await?;

        let summary = LoadSummary {
            path,
            events,
            parse_errors: result.errors.len(),
            dropped,
            bytes_read: result.bytes_read,
            elapsed_ms: timer.elapsed().as_millis(),
        };
        info!(
            source = %source,
            events = summary.events,
            parse_errors = summary.parse_errors,
            dropped = summary.dropped,
            elapsed_ms = summary.elapsed_ms,
            "Record file replayed"
        );
        Ok(summary)
    }

    pub fn select_fights(&self, selector: &FightSelector) -> Vec<SharedFight> {
        let fights = match selector {
            FightSelector::Overlay => return self.lifecycle.overlay_fights(),
            _ => self.lifecycle.fights(),
        };

        fights
            .into_iter()
            .filter(|fight| {
                let Ok(f) = fight.read() else {
                    return false;
                };
                match selector {
                    FightSelector::All | FightSelector::Overlay => true,
                    FightSelector::Ids(ids) => ids.contains(&f.id),
                    FightSelector::Name(name) => resolve(f.name).eq_ignore_ascii_case(name),
                    FightSelector::Group(group) => f.group_id == *group,
                }
            })
            .collect()
    }

    /// Build a report on the blocking pool.
    pub async fn stats(
        &self,
        dimension: StatsDimension,
        selector: &FightSelector,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<StatsOutcome, ContextError> {
        let engine = Arc::clone(self.engine(dimension));
        let fights = self.select_fights(selector);
        Ok(tokio::task::spawn_blocking(move || engine.build(&fights, min, max)).await?)
    }

    /// Recompute the last report of `dimension` for a new window.
    pub async fn rebuild_stats(
        &self,
        dimension: StatsDimension,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<StatsOutcome, ContextError> {
        let engine = Arc::clone(self.engine(dimension));
        Ok(tokio::task::spawn_blocking(move || engine.rebuild(min, max)).await?)
    }

    /// Drop all fights, heals and reports. Known players and pets are kept.
    pub async fn reset(&self) {
        let senders = self.tasks.lock().await.senders();
        for sender in senders {
            let _ = sender.send(WriterMessage::Reset).await;
        }
        self.lifecycle.reset();
        self.heal_log.clear();
        for dimension in StatsDimension::ALL {
            self.engine(dimension).reset();
        }
        info!("Session reset");
    }

    pub async fn shutdown(&self) {
        self.tasks.lock().await.abort_all().await;
    }
}
