//! Decides who attacked whom
//!
//! Combat records do not say which side a name belongs to. The classifier
//! combines the player registry, creature names seen in earlier fights and a
//! cache of spells recently cast by players to decide whether a damage record
//! is player damage against a creature, creature damage against a player, or
//! neither.

use hashbrown::{HashMap, HashSet};

use super::lifecycle::FightLifecycle;
use crate::combat_log::{DamageRecord, HitType};
use crate::context::{IStr, eq_ignore_case, intern, resolve};
use crate::players::{PlayerRegistry, UNKNOWN, is_possible_player_name};

/// Which side of a damage record the fight belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// A player-side actor hit the creature named by the defender
    Damage,
    /// The creature named by the attacker hit a player-side target
    Tanking,
}

pub struct AttackClassifier {
    recent_spell_secs: f64,
    recent_spells: HashSet<IStr>,
    /// (attacker, defender) → defender is the creature; valid for one tick
    valid_combo: HashMap<(IStr, IStr), bool>,
    last_tick: Option<f64>,
    /// Last tick with an attributed record; the spell cache ages from here
    last_valid_tick: Option<f64>,
}

impl AttackClassifier {
    pub fn new(recent_spell_secs: f64) -> Self {
        Self {
            recent_spell_secs,
            recent_spells: HashSet::new(),
            valid_combo: HashMap::new(),
            last_tick: None,
            last_valid_tick: None,
        }
    }

    pub fn reset(&mut self) {
        self.recent_spells.clear();
        self.valid_combo.clear();
        self.last_tick = None;
        self.last_valid_tick = None;
    }

    /// Advance to `time`. Returns true when this is a new tick.
    pub fn begin_tick(&mut self, time: f64) -> bool {
        if self.last_tick == Some(time) {
            return false;
        }
        self.valid_combo.clear();
        if let Some(last) = self.last_valid_tick
            && time - last > self.recent_spell_secs
        {
            self.recent_spells.clear();
        }
        self.last_tick = Some(time);
        true
    }

    pub fn remembers_spell(&self, spell: IStr) -> bool {
        self.recent_spells.contains(&spell)
    }

    /// Classify one damage record. A spell-sourced hit on a creature with no
    /// known caster is renamed to the unknown attacker.
    pub fn classify(
        &mut self,
        record: &mut DamageRecord,
        registry: &PlayerRegistry,
        lifecycle: &FightLifecycle,
    ) -> Option<Attribution> {
        let is_attacker_player = registry.is_pet_or_player_or_merc(record.attacker)
            || resolve(record.attacker) == HitType::ReverseShield.label();

        if is_attacker_player && record.hit_type.is_player_spell() {
            self.recent_spells.insert(record.sub_type);
        }

        let combo = (record.attacker, record.defender);
        let mut npc_defender = match self.valid_combo.get(&combo) {
            Some(cached) => *cached,
            None => self.is_valid_attack(record, is_attacker_player, registry, lifecycle)?,
        };
        self.valid_combo.insert(combo, npc_defender);
        self.last_valid_tick = self.last_tick;

        if record.attacker_is_spell && npc_defender {
            // a player may be the one being hit
            npc_defender = !registry.is_pet_or_player_or_merc(record.defender);
            if npc_defender {
                record.attacker = intern(UNKNOWN);
            }
        }

        Some(if npc_defender {
            Attribution::Damage
        } else {
            Attribution::Tanking
        })
    }

    /// `Some(npc_defender)` when the record is a valid attack.
    fn is_valid_attack(
        &self,
        record: &DamageRecord,
        is_attacker_player: bool,
        registry: &PlayerRegistry,
        lifecycle: &FightLifecycle,
    ) -> Option<bool> {
        if eq_ignore_case(record.attacker, record.defender) {
            return None;
        }

        let known_npc = |name: IStr| registry.is_known_npc(name) || lifecycle.is_lifetime_fight(name);

        let is_attacker_player_spell = record.attacker_is_spell && self.recent_spells.contains(&record.attacker);
        let is_attacker_player = is_attacker_player || is_attacker_player_spell;
        let is_defender_player = registry.is_pet_or_player_or_merc(record.defender);
        let is_attacker_npc = (!is_attacker_player && known_npc(record.attacker))
            || (record.attacker_is_spell && !is_attacker_player_spell);
        let is_defender_npc = (!is_defender_player && known_npc(record.defender)) || is_attacker_player_spell;

        if is_defender_npc {
            if !is_attacker_npc {
                let valid = is_attacker_player || is_possible_player_name(resolve(record.attacker));
                return valid.then_some(true);
            }
            if lifecycle.get_fight(record.defender).is_some() && lifecycle.get_fight(record.attacker).is_none() {
                return Some(true);
            }
        } else if is_attacker_npc {
            let valid = is_defender_player || is_possible_player_name(resolve(record.defender));
            return valid.then_some(false);
        } else if is_defender_player != is_attacker_player {
            return Some(!is_defender_player);
        }

        None
    }
}
