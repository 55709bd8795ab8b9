use super::fight::FightSnapshot;

/// Fight lifecycle notifications, published on a broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FightSignal {
    FightCreated(FightSnapshot),
    FightUpdated(FightSnapshot),
    FightRemoved(FightSnapshot),
}

impl FightSignal {
    pub fn snapshot(&self) -> &FightSnapshot {
        match self {
            FightSignal::FightCreated(s) | FightSignal::FightUpdated(s) | FightSignal::FightRemoved(s) => s,
        }
    }

    pub fn fight_id(&self) -> i64 {
        self.snapshot().id
    }
}

/// Trait for consumers that react to fight signals (lists, overlays, logs).
pub trait SignalHandler {
    fn handle_signal(&mut self, signal: &FightSignal);

    /// Handle multiple signals (default implementation calls handle_signal for each)
    fn handle_signals(&mut self, signals: &[FightSignal]) {
        for signal in signals {
            self.handle_signal(signal);
        }
    }

    /// Called when receivers fell behind and `skipped` signals were dropped
    fn on_lagged(&mut self, _skipped: u64) {}
}
