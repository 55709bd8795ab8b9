use std::sync::Arc;

use fightlog_types::FightSettings;

use super::classifier::{AttackClassifier, Attribution};
use super::error::ProcessError;
use super::heal_log::HealLog;
use super::lifecycle::FightLifecycle;
use crate::combat_log::{CombatEvent, DamageRecord, LogAction};
use crate::players::PlayerRegistry;

/// The ordered write path for one record source.
///
/// Each source gets its own processor so records are applied in arrival
/// order; the registries it writes to are shared.
pub struct FightProcessor {
    registry: Arc<PlayerRegistry>,
    lifecycle: Arc<FightLifecycle>,
    heal_log: Arc<HealLog>,
    classifier: AttackClassifier,
    last_timestamp: Option<f64>,
}

impl FightProcessor {
    pub fn new(
        registry: Arc<PlayerRegistry>,
        lifecycle: Arc<FightLifecycle>,
        heal_log: Arc<HealLog>,
        settings: &FightSettings,
    ) -> Self {
        Self {
            registry,
            lifecycle,
            heal_log,
            classifier: AttackClassifier::new(settings.recent_spell_secs),
            last_timestamp: None,
        }
    }

    pub fn reset(&mut self) {
        self.classifier.reset();
        self.last_timestamp = None;
    }

    /// Apply one record. Errors describe why the record was dropped.
    pub fn process_event(&mut self, event: CombatEvent) -> Result<(), ProcessError> {
        if let Some(last) = self.last_timestamp
            && event.timestamp < last
        {
            return Err(ProcessError::OutOfOrder {
                line_number: event.line_number,
                timestamp: event.timestamp,
                last,
            });
        }
        self.last_timestamp = Some(event.timestamp);

        match event.action {
            LogAction::Damage(record) => self.process_damage(record, event.timestamp),
            LogAction::Heal(record) => {
                if record.total < 0 {
                    return Err(ProcessError::NegativeAmount {
                        line_number: record.line_number,
                        total: record.total,
                    });
                }
                self.heal_log.add(record, event.timestamp)
            }
            LogAction::Taunt(record) => self.lifecycle.record_taunt(record, event.timestamp),
        }
    }

    fn process_damage(&mut self, mut record: DamageRecord, time: f64) -> Result<(), ProcessError> {
        if record.total < 0 {
            return Err(ProcessError::NegativeAmount {
                line_number: record.line_number,
                total: record.total,
            });
        }

        if self.classifier.begin_tick(time) {
            self.lifecycle.check_expire(time);
        }

        let Some(attribution) = self.classifier.classify(&mut record, &self.registry, &self.lifecycle) else {
            tracing::trace!(line = record.line_number, "Record not attributable to a fight");
            return Ok(());
        };

        match attribution {
            Attribution::Damage => {
                let fight = self.lifecycle.get_or_create(record.defender, time);
                self.lifecycle.record_damage(&fight, record, time)
            }
            Attribution::Tanking => {
                let fight = self.lifecycle.get_or_create(record.attacker, time);
                self.lifecycle.record_tanking(&fight, record, time)
            }
        }
    }

    /// Process a batch in order, logging and dropping failed records.
    /// Returns the number of records that failed.
    pub fn process_all<I: IntoIterator<Item = CombatEvent>>(&mut self, events: I) -> usize {
        let mut failed = 0;
        for event in events {
            if let Err(e) = self.process_event(event) {
                tracing::debug!(error = %e, "Dropped record");
                failed += 1;
            }
        }
        failed
    }
}
