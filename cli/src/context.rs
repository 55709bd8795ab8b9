use std::sync::Arc;

use fightlog_core::context::{AppConfig, AppConfigExt, AppContext};
use fightlog_core::encounter::{FightSignal, SignalHandler};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, RwLock, broadcast};
use tokio::task::JoinHandle;

/// Holds all shared state for the CLI application.
/// This is a lightweight container - logic lives in the core services.
#[derive(Clone)]
pub struct CliContext {
    pub app: Arc<AppContext>,
    /// Editable copy of the configuration; saved on change, applied on restart
    pub config: Arc<RwLock<AppConfig>>,
    signal_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CliContext {
    pub fn new() -> Self {
        Self::with_config(AppConfig::load())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self {
            app: Arc::new(AppContext::new(config.clone())),
            config: Arc::new(RwLock::new(config)),
            signal_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Start printing fight creation and expiry as they happen.
    pub async fn start_signal_printer(&self) {
        let receiver = self.app.lifecycle().subscribe();
        let handle = spawn_signal_task(receiver, SignalPrinter);
        if let Some(previous) = self.signal_task.lock().await.replace(handle) {
            previous.abort();
        }
    }

    pub async fn shutdown(&self) {
        if let Some(handle) = self.signal_task.lock().await.take() {
            handle.abort();
        }
        self.app.shutdown().await;
    }
}

impl Default for CliContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints fight creation and expiry lines to stdout.
pub struct SignalPrinter;

impl SignalHandler for SignalPrinter {
    fn handle_signal(&mut self, signal: &FightSignal) {
        match signal {
            FightSignal::FightCreated(s) => {
                println!("+ fight #{} {} (group {}) at {}", s.id, s.name_str(), s.group_id, s.begin_time_string);
            }
            FightSignal::FightRemoved(s) => {
                println!("- fight #{} {}: {} damage in {} hits", s.id, s.name_str(), s.damage_total, s.damage_hits);
            }
            FightSignal::FightUpdated(_) => {}
        }
    }

    fn on_lagged(&mut self, skipped: u64) {
        tracing::debug!(skipped, "Fight signals skipped");
    }
}

/// Feed a broadcast receiver into a handler until the channel closes.
pub fn spawn_signal_task<H>(mut receiver: broadcast::Receiver<FightSignal>, mut handler: H) -> JoinHandle<()>
where
    H: SignalHandler + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(signal) => handler.handle_signal(&signal),
                Err(RecvError::Lagged(skipped)) => handler.on_lagged(skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
