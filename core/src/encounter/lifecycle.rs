//! Registry of active, overlay and lifetime fights
//!
//! The active registry maps a creature name to the fight currently collecting
//! its actions. Expired fights leave the active registry but stay reachable
//! through the overlay registry (until pruned) and through [`FightLifecycle::fights`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::{DashMap, DashSet};
use fightlog_types::{FightSettings, ValidatorSettings};
use tokio::sync::broadcast;

use super::error::ProcessError;
use super::fight::{Fight, FightSnapshot, FightTotalDamage, SharedFight, create_record_key, update_time_segments};
use super::signal::FightSignal;
use crate::combat_log::{DamageRecord, TauntRecord, add_action};
use crate::context::{IStr, resolve};
use crate::stats::DamageValidator;

#[derive(Debug, Default)]
struct GroupTracker {
    group_id: i32,
    last_activity: Option<f64>,
}

pub struct FightLifecycle {
    settings: FightSettings,
    validator: DamageValidator,
    active: DashMap<IStr, SharedFight>,
    overlay: DashMap<i64, SharedFight>,
    lifetime: DashSet<IStr>,
    all: DashMap<i64, SharedFight>,
    next_id: AtomicI64,
    groups: Mutex<GroupTracker>,
    signals: broadcast::Sender<FightSignal>,
}

fn poisoned(name: IStr) -> ProcessError {
    ProcessError::FightLockPoisoned {
        name: resolve(name).to_string(),
    }
}

impl FightLifecycle {
    pub fn new(settings: FightSettings, validator: ValidatorSettings, capacity: usize) -> Self {
        let (signals, _) = broadcast::channel(capacity.max(1));
        Self {
            settings,
            validator: DamageValidator::new(validator),
            active: DashMap::new(),
            overlay: DashMap::new(),
            lifetime: DashSet::new(),
            all: DashMap::new(),
            next_id: AtomicI64::new(1),
            groups: Mutex::new(GroupTracker::default()),
            signals,
        }
    }

    pub fn settings(&self) -> &FightSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FightSignal> {
        self.signals.subscribe()
    }

    fn emit(&self, signal: FightSignal) {
        // No receivers is fine
        let _ = self.signals.send(signal);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────

    /// The active fight for a creature name.
    pub fn get_fight(&self, name: IStr) -> Option<SharedFight> {
        self.active.get(&name).map(|f| Arc::clone(f.value()))
    }

    pub fn get_by_id(&self, id: i64) -> Option<SharedFight> {
        self.all.get(&id).map(|f| Arc::clone(f.value()))
    }

    /// Every fight of the session in id order.
    pub fn fights(&self) -> Vec<SharedFight> {
        let mut entries: Vec<(i64, SharedFight)> = self
            .all
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, f)| f).collect()
    }

    pub fn overlay_fights(&self) -> Vec<SharedFight> {
        let mut entries: Vec<(i64, SharedFight)> = self
            .overlay
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, f)| f).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// True when any fight of this session was named `name`.
    pub fn is_lifetime_fight(&self, name: IStr) -> bool {
        self.lifetime.contains(&name)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creation and updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Existing active fight for `name`, or a new one starting at `time`.
    pub fn get_or_create(&self, name: IStr, time: f64) -> SharedFight {
        let mut created = None;
        let fight = self
            .active
            .entry(name)
            .or_insert_with(|| {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let fight = Fight::new(id, name, self.group_for(time), time);
                created = Some(fight.snapshot());
                Arc::new(RwLock::new(fight))
            })
            .value()
            .clone();

        if let Some(snapshot) = created {
            self.all.insert(snapshot.id, Arc::clone(&fight));
            self.overlay.insert(snapshot.id, Arc::clone(&fight));
            self.lifetime.insert(name);
            tracing::info!(id = snapshot.id, name = resolve(name), group = snapshot.group_id, "Fight created");
            self.emit(FightSignal::FightCreated(snapshot));
        }
        fight
    }

    /// Group of a fight starting at `time`: a new group once the hard timeout
    /// has passed since the last recorded activity.
    fn group_for(&self, time: f64) -> i32 {
        let mut tracker = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(last) = tracker.last_activity
            && time - last > self.settings.max_timeout_secs
        {
            tracker.group_id += 1;
        }
        tracker.last_activity = Some(tracker.last_activity.map_or(time, |l| l.max(time)));
        tracker.group_id
    }

    fn touch(&self, time: f64) {
        let mut tracker = self.groups.lock().unwrap_or_else(|e| e.into_inner());
        tracker.last_activity = Some(tracker.last_activity.map_or(time, |l| l.max(time)));
    }

    /// Run `write` on `fight`, or on the fight that replaced it when it expired
    /// before the write lock was taken. Dead fights never take new actions.
    fn write_live<T>(
        &self,
        fight: &SharedFight,
        name: IStr,
        time: f64,
        write: impl FnOnce(&mut Fight) -> T,
    ) -> Result<T, ProcessError> {
        let mut f = fight.write().map_err(|_| poisoned(name))?;
        if !f.dead {
            return Ok(write(&mut f));
        }
        drop(f);

        let current = self.get_or_create(name, time);
        if Arc::ptr_eq(&current, fight) {
            return Err(ProcessError::FightExpired {
                name: resolve(name).to_string(),
            });
        }
        tracing::debug!(name = resolve(name), "Fight expired before the write; using its successor");
        self.write_live(&current, name, time, write)
    }

    /// Record damage dealt to the fight's creature.
    pub fn record_damage(&self, fight: &SharedFight, record: DamageRecord, time: f64) -> Result<(), ProcessError> {
        let snapshot = self.write_live(fight, record.defender, time, |f| {
            let key = create_record_key(record.hit_type, record.sub_type);
            update_time_segments(&mut f.damage_segments, &mut f.damage_sub_segments, key, record.attacker, time);
            f.begin_damage_time.get_or_insert(time);
            f.last_damage_time = Some(time);

            if record.hit_type.is_hit() {
                f.damage_hits += 1;
                f.damage_total = f.damage_total.saturating_add(record.total);

                let source = record.attacker_owner.unwrap_or(record.attacker);
                let counted = if self.validator.is_valid(&record) { record.total } else { 0 };
                f.player_damage_totals
                    .entry(source)
                    .and_modify(|t| {
                        t.damage = t.damage.saturating_add(counted);
                        if t.pet_owner.is_none() {
                            t.pet_owner = record.attacker_owner;
                        }
                        t.update_time = time;
                    })
                    .or_insert(FightTotalDamage {
                        damage: counted,
                        pet_owner: record.attacker_owner,
                        begin_time: time,
                        update_time: time,
                    });

                if let Some(stats) = f.spell_stats_mut(record.hit_type, record.attacker, record.sub_type) {
                    stats.count += 1;
                    stats.max = stats.max.max(record.total);
                    stats.total = stats.total.saturating_add(record.total);
                }
            }

            add_action(&mut f.damage_blocks, record, time);
            f.last_time = time;
            f.snapshot()
        })?;
        self.touch(time);
        self.emit(FightSignal::FightUpdated(snapshot));
        Ok(())
    }

    /// Record damage the fight's creature dealt to a player.
    pub fn record_tanking(&self, fight: &SharedFight, record: DamageRecord, time: f64) -> Result<(), ProcessError> {
        let snapshot = self.write_live(fight, record.attacker, time, |f| {
            let key = create_record_key(record.hit_type, record.sub_type);
            update_time_segments(&mut f.tank_segments, &mut f.tank_sub_segments, key, record.defender, time);
            f.begin_tanking_time.get_or_insert(time);
            f.last_tanking_time = Some(time);

            f.tank_hits += 1;
            f.tank_total = f.tank_total.saturating_add(record.total);
            f.player_tank_totals
                .entry(record.defender)
                .and_modify(|t| {
                    t.damage = t.damage.saturating_add(record.total);
                    t.update_time = time;
                })
                .or_insert(FightTotalDamage {
                    damage: record.total,
                    pet_owner: None,
                    begin_time: time,
                    update_time: time,
                });

            add_action(&mut f.tanking_blocks, record, time);
            f.last_time = time;
            f.snapshot()
        })?;
        self.touch(time);
        self.emit(FightSignal::FightUpdated(snapshot));
        Ok(())
    }

    /// Taunts are attached to the creature's fight without extending it.
    pub fn record_taunt(&self, record: TauntRecord, time: f64) -> Result<(), ProcessError> {
        let fight = self.get_or_create(record.npc, time);
        self.write_live(&fight, record.npc, time, |f| add_action(&mut f.taunt_blocks, record, time))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiry
    // ─────────────────────────────────────────────────────────────────────────

    /// Expire active fights idle for longer than the hard timeout, or the soft
    /// timeout once they have damage. Returns the expired fights.
    pub fn check_expire(&self, time: f64) -> Vec<FightSnapshot> {
        let candidates: Vec<(IStr, SharedFight)> = self
            .active
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();

        let mut expired = Vec::new();
        for (name, fight) in candidates {
            let Ok(mut f) = fight.write() else {
                tracing::error!(name = resolve(name), "Fight lock poisoned; dropping from active registry");
                self.active.remove_if(&name, |_, current| Arc::ptr_eq(current, &fight));
                continue;
            };
            let diff = time - f.last_time;
            if diff > self.settings.max_timeout_secs
                || (diff > self.settings.fight_timeout_secs && !f.damage_blocks.is_empty())
            {
                f.dead = true;
                let snapshot = f.snapshot();
                // Leave the registry before releasing the fight so a writer
                // that finds it dead resolves to a fresh fight
                self.active.remove_if(&name, |_, current| Arc::ptr_eq(current, &fight));
                drop(f);

                tracing::info!(id = snapshot.id, name = resolve(name), idle = diff, "Fight expired");
                self.emit(FightSignal::FightRemoved(snapshot.clone()));
                expired.push(snapshot);
            }
        }
        expired.sort_by_key(|s| s.id);
        expired
    }

    /// Drop overlay fights idle for longer than the overlay timeout.
    pub fn prune_overlay(&self, time: f64) -> usize {
        let timeout = self.settings.overlay_timeout_secs;
        let before = self.overlay.len();
        self.overlay.retain(|_, fight| {
            fight
                .read()
                .map(|f| time - f.last_time <= timeout)
                .unwrap_or(false)
        });
        before - self.overlay.len()
    }

    pub fn reset_overlay(&self) {
        self.overlay.clear();
    }

    /// Forget every fight. Active fights are reported as removed.
    pub fn reset(&self) {
        let active: Vec<SharedFight> = self.active.iter().map(|e| Arc::clone(e.value())).collect();
        let mut removed: Vec<FightSnapshot> = active
            .iter()
            .filter_map(|fight| fight.read().ok().map(|f| f.snapshot()))
            .collect();
        removed.sort_by_key(|s| s.id);

        self.active.clear();
        self.overlay.clear();
        self.lifetime.clear();
        self.all.clear();
        self.next_id.store(1, Ordering::SeqCst);
        *self.groups.lock().unwrap_or_else(|e| e.into_inner()) = GroupTracker::default();

        for snapshot in removed {
            self.emit(FightSignal::FightRemoved(snapshot));
        }
        tracing::info!("Fight registries reset");
    }
}
