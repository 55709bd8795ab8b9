use std::collections::BTreeMap;

use serde::Serialize;

use crate::combat_log::{HitRecord, HitType, Modifiers};
use crate::context::resolve;

use super::calc::{percent, rate, round2};

const REGULAR_MELEE: [&str; 6] = ["Bites", "Claws", "Crushes", "Pierces", "Punches", "Slashes"];

/// Counters and derived rates for one player, or one key of a player.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerSubStats {
    pub rank: u16,
    pub name: String,
    /// Record key ("DoT Tick=Flame Lick"), empty for player rows
    pub key: String,
    pub hit_type: String,

    pub hits: u32,
    pub crit_hits: u32,
    pub lucky_hits: u32,
    pub twincast_hits: u32,
    pub non_twincast_crit_hits: u32,
    pub non_twincast_lucky_hits: u32,
    pub misses: u32,
    pub dodges: u32,
    pub parries: u32,
    pub blocks: u32,
    pub absorbs: u32,
    pub invulnerable: u32,
    pub riposte_hits: u32,
    pub melee_attempts: u32,
    pub melee_hits: u32,
    pub regular_melee_hits: u32,
    pub bow_hits: u32,
    pub double_bow_hits: u32,
    pub spell_hits: u32,
    pub bane_hits: u32,
    pub flurry_hits: u32,
    pub rampage_hits: u32,
    pub strikethrough_hits: u32,
    pub assassinate_hits: u32,
    pub finishing_hits: u32,
    pub headshot_hits: u32,
    pub slay_hits: u32,

    pub total: i64,
    pub total_crit: i64,
    pub total_lucky: i64,
    pub total_non_twincast: i64,
    pub total_non_twincast_crit: i64,
    pub total_non_twincast_lucky: i64,
    pub total_riposte: i64,
    pub total_assassinate: i64,
    pub total_finishing: i64,
    pub total_headshot: i64,
    pub total_slay: i64,
    pub max: i64,
    pub min: i64,
    pub max_potential_hit: i64,
    pub extra: i64,
    pub best_sec: i64,
    #[serde(skip)]
    best_sec_temp: i64,

    pub total_seconds: f64,
    pub dps: i64,
    pub sdps: i64,
    pub pdps: i64,
    pub potential: i64,
    pub avg: i64,
    pub avg_crit: i64,
    pub avg_lucky: i64,
    pub avg_non_twincast: i64,
    pub avg_non_twincast_crit: i64,
    pub avg_non_twincast_lucky: i64,
    pub crit_rate: f64,
    pub lucky_rate: f64,
    pub twincast_rate: f64,
    pub extra_rate: f64,
    pub flurry_rate: f64,
    pub riposte_rate: f64,
    pub rampage_rate: f64,
    pub double_bow_rate: f64,
    pub melee_hit_rate: f64,
    pub melee_acc_rate: f64,
    pub melee_undefended: u32,
    pub percent: f64,
    pub percent_of_raid: f64,

    /// Hit amount → count, for critical and non-critical hits
    pub crit_freq: BTreeMap<i64, u32>,
    pub non_crit_freq: BTreeMap<i64, u32>,
}

impl PlayerSubStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn for_key(name: &str, key: &str, hit_type: HitType) -> Self {
        Self {
            name: name.to_string(),
            key: key.to_string(),
            hit_type: hit_type.label().to_string(),
            ..Default::default()
        }
    }

    /// Count one record. `new_frame` marks the first record of a new second
    /// for this row, closing the running best-second total.
    pub fn update<R: HitRecord>(&mut self, record: &R, new_frame: bool, is_pet: bool) {
        let mut new_melee_hit = false;
        let mut parse_modifiers = true;

        match record.hit_type() {
            HitType::Absorb => {
                self.absorbs += 1;
                self.melee_attempts += 1;
                parse_modifiers = false;
            }
            HitType::Bane => {
                self.bane_hits += 1;
                self.hits += 1;
            }
            HitType::Block => {
                self.blocks += 1;
                self.melee_attempts += 1;
            }
            HitType::Dodge => {
                self.dodges += 1;
                self.melee_attempts += 1;
            }
            HitType::Miss => {
                self.misses += 1;
                self.melee_attempts += 1;
            }
            HitType::Parry => {
                self.parries += 1;
                self.melee_attempts += 1;
            }
            HitType::Riposte => {
                self.riposte_hits += 1;
                self.melee_attempts += 1;
            }
            HitType::Invulnerable => {
                self.invulnerable += 1;
                self.melee_attempts += 1;
            }
            HitType::Proc
            | HitType::DamageOverTime
            | HitType::DirectDamage
            | HitType::Heal
            | HitType::HealOverTime => {
                self.spell_hits += 1;
                self.hits += 1;
            }
            HitType::DamageShield | HitType::ReverseShield => {
                self.hits += 1;
            }
            HitType::Melee => {
                self.hits += 1;
                self.melee_attempts += 1;
                new_melee_hit = true;
            }
        }

        if new_melee_hit {
            let verb = resolve(record.sub_type());
            if REGULAR_MELEE.contains(&verb) || (verb == "Hits" && is_pet) {
                self.regular_melee_hits += 1;
            } else if verb == "Shoots" {
                self.bow_hits += 1;
            }
            self.melee_hits += 1;
        }

        let total = record.total();
        if total > 0 {
            self.total = self.total.saturating_add(total);
            self.max = self.max.max(total);
            self.min = if self.min == 0 { total } else { self.min.min(total) };

            if new_frame {
                self.best_sec = self.best_sec.max(self.best_sec_temp);
                self.best_sec_temp = 0;
            }
            self.best_sec_temp = self.best_sec_temp.saturating_add(total);
        }

        if record.over_total() > 0 {
            self.extra = self.extra.saturating_add(record.over_total().saturating_sub(total));
        }
        self.max_potential_hit = self.max_potential_hit.max(total.max(record.over_total()));

        if parse_modifiers {
            self.count_modifiers(record.modifiers(), total);
        }
    }

    fn count_modifiers(&mut self, m: Modifiers, total: i64) {
        let twincast = m.contains(Modifiers::TWINCAST);
        if twincast {
            self.twincast_hits += 1;
        } else {
            self.total_non_twincast = self.total_non_twincast.saturating_add(total);
        }

        if m.contains(Modifiers::CRIT) {
            self.crit_hits += 1;
            self.total_crit = self.total_crit.saturating_add(total);
            if !twincast {
                self.non_twincast_crit_hits += 1;
                self.total_non_twincast_crit = self.total_non_twincast_crit.saturating_add(total);
            }
        }

        if m.contains(Modifiers::LUCKY) {
            self.lucky_hits += 1;
            self.total_lucky = self.total_lucky.saturating_add(total);
            if !twincast {
                self.non_twincast_lucky_hits += 1;
                self.total_non_twincast_lucky = self.total_non_twincast_lucky.saturating_add(total);
            }
        }

        if m.contains(Modifiers::FLURRY) {
            self.flurry_hits += 1;
        }
        if m.contains(Modifiers::RAMPAGE) {
            self.rampage_hits += 1;
        }
        if m.contains(Modifiers::STRIKETHROUGH) {
            self.strikethrough_hits += 1;
        }
        if m.contains(Modifiers::RIPOSTE) {
            self.total_riposte = self.total_riposte.saturating_add(total);
        }
        if m.contains(Modifiers::DOUBLE_BOW) {
            self.double_bow_hits += 1;
        }
        if m.contains(Modifiers::ASSASSINATE) {
            self.assassinate_hits += 1;
            self.total_assassinate = self.total_assassinate.saturating_add(total);
        }
        if m.contains(Modifiers::FINISHING_BLOW) {
            self.finishing_hits += 1;
            self.total_finishing = self.total_finishing.saturating_add(total);
        }
        if m.contains(Modifiers::HEADSHOT) {
            self.headshot_hits += 1;
            self.total_headshot = self.total_headshot.saturating_add(total);
        }
        if m.contains(Modifiers::SLAY_UNDEAD) {
            self.slay_hits += 1;
            self.total_slay = self.total_slay.saturating_add(total);
        }
    }

    /// Record a hit amount in the crit or non-crit histogram.
    pub(crate) fn add_frequency(&mut self, total: i64, was_crit: bool) {
        let freq = if was_crit { &mut self.crit_freq } else { &mut self.non_crit_freq };
        *freq.entry(total).or_insert(0) += 1;
    }

    /// Derived fields. `parent` is the owning row's `(total, total_seconds)`
    /// for sub stats; top-level rows use the raid seconds for SDPS.
    pub(crate) fn calculate(&mut self, raid_total: i64, raid_seconds: f64, parent: Option<(i64, f64)>) {
        if self.hits > 0 {
            let hits = self.hits as f64;
            self.potential = self.total.saturating_add(self.extra);
            self.dps = rate(self.total, self.total_seconds);
            self.sdps = rate(self.total, raid_seconds);
            self.pdps = rate(self.potential, self.total_seconds);
            self.avg = round2(self.total as f64 / hits) as i64;

            let non_lucky_crits = self.crit_hits.saturating_sub(self.lucky_hits);
            if non_lucky_crits > 0 {
                self.avg_crit = round2(self.total_crit as f64 / non_lucky_crits as f64) as i64;
            }
            if self.lucky_hits > 0 {
                self.avg_lucky = round2(self.total_lucky as f64 / self.lucky_hits as f64) as i64;
            }
            if self.non_twincast_crit_hits > 0 {
                self.avg_non_twincast_crit =
                    round2(self.total_non_twincast_crit as f64 / self.non_twincast_crit_hits as f64) as i64;
            }
            if self.non_twincast_lucky_hits > 0 {
                self.avg_non_twincast_lucky =
                    round2(self.total_non_twincast_lucky as f64 / self.non_twincast_lucky_hits as f64) as i64;
            }
            let non_twincast = self.hits.saturating_sub(self.twincast_hits);
            if non_twincast > 0 {
                self.avg_non_twincast = round2(self.total_non_twincast as f64 / non_twincast as f64) as i64;
            }

            self.extra_rate = percent(self.extra as f64, self.potential as f64);
            self.crit_rate = percent(self.crit_hits as f64, hits);
            self.lucky_rate = percent(self.lucky_hits as f64, hits);
            self.flurry_rate = percent(self.flurry_hits as f64, self.regular_melee_hits as f64);
            self.riposte_rate = percent(self.riposte_hits as f64, self.melee_hits as f64);
            self.rampage_rate = percent(self.rampage_hits as f64, self.melee_hits as f64);
            self.double_bow_rate = percent(self.double_bow_hits as f64, self.bow_hits as f64);

            if self.melee_attempts > 0 {
                self.melee_hit_rate = percent(self.melee_hits as f64, self.melee_attempts as f64);
                let defended = self.parries + self.dodges + self.blocks + self.invulnerable + self.absorbs;
                let undefended_attempts = self.melee_attempts.saturating_sub(defended);
                self.melee_acc_rate = percent(self.melee_hits as f64, undefended_attempts as f64);
            }
            self.melee_undefended = self.melee_hits.saturating_sub(self.strikethrough_hits);

            if self.spell_hits > 0 {
                let multiplier = if self.hit_type == HitType::DirectDamage.label() { 2.0 } else { 1.0 };
                let twincast_rate = percent(self.twincast_hits as f64 * multiplier, self.spell_hits as f64);
                self.twincast_rate = twincast_rate.min(100.0);
            }

            if let Some((parent_total, parent_seconds)) = parent
                && parent_total > 0
            {
                self.percent = percent(self.total as f64, parent_total as f64);
                self.sdps = rate(self.total, parent_seconds);
            }
        }

        self.percent_of_raid = percent(self.total as f64, raid_total as f64);

        if self.best_sec_temp > 0 {
            self.best_sec = self.best_sec.max(self.best_sec_temp);
            self.best_sec_temp = 0;
        }
    }
}

/// A ranked row of a report: one player, pet, or "Owner +Pets" aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStats {
    pub summary: PlayerSubStats,
    /// Player the row belongs to; the owner for "+Pets" aggregates
    pub orig_name: String,
    pub class_name: String,
    pub is_top_level: bool,
    /// Per record key, highest total first
    pub sub_stats: Vec<PlayerSubStats>,
}

impl PlayerStats {
    pub fn new(name: &str, orig_name: &str, class_name: &str) -> Self {
        Self {
            summary: PlayerSubStats {
                percent: 100.0,
                ..PlayerSubStats::new(name)
            },
            orig_name: orig_name.to_string(),
            class_name: class_name.to_string(),
            is_top_level: true,
            sub_stats: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.summary.name
    }

    pub fn total(&self) -> i64 {
        self.summary.total
    }

    /// Derive this row and its sub stats.
    pub(crate) fn calculate(&mut self, raid_total: i64, raid_seconds: f64) {
        self.summary.calculate(raid_total, raid_seconds, None);
        let parent = (self.summary.total, self.summary.total_seconds);
        for sub in &mut self.sub_stats {
            sub.calculate(raid_total, raid_seconds, Some(parent));
        }
    }
}
