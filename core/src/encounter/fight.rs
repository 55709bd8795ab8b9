use std::sync::{Arc, RwLock};

use chrono::DateTime;
use hashbrown::HashMap;

use crate::combat_log::{ActionGroup, DamageRecord, HitType, TauntRecord};
use crate::context::{IStr, intern, resolve};
use crate::timeline::TimeSegment;

/// A fight shared between the writer that mutates it and report readers.
pub type SharedFight = Arc<RwLock<Fight>>;

/// Running per-source total for one fight. Never decremented.
#[derive(Debug, Clone, PartialEq)]
pub struct FightTotalDamage {
    pub damage: i64,
    pub pet_owner: Option<IStr>,
    pub begin_time: f64,
    pub update_time: f64,
}

/// Per caster and spell tally of direct, over-time or proc damage.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellDamageStats {
    pub caster: IStr,
    pub spell: IStr,
    pub count: u32,
    pub max: i64,
    pub total: i64,
}

/// One encounter against a named hostile creature.
#[derive(Debug, Clone)]
pub struct Fight {
    pub id: i64,
    pub name: IStr,
    pub correct_map_key: IStr,
    pub group_id: i32,
    pub begin_time: f64,
    pub begin_time_string: String,
    pub last_time: f64,
    pub begin_damage_time: Option<f64>,
    pub last_damage_time: Option<f64>,
    pub begin_tanking_time: Option<f64>,
    pub last_tanking_time: Option<f64>,
    pub dead: bool,

    pub damage_total: i64,
    pub damage_hits: u64,
    pub tank_total: i64,
    pub tank_hits: u64,
    pub player_damage_totals: HashMap<IStr, FightTotalDamage>,
    pub player_tank_totals: HashMap<IStr, FightTotalDamage>,

    pub damage_blocks: Vec<ActionGroup<DamageRecord>>,
    pub tanking_blocks: Vec<ActionGroup<DamageRecord>>,
    pub taunt_blocks: Vec<ActionGroup<TauntRecord>>,

    /// First to last action per player
    pub damage_segments: HashMap<IStr, TimeSegment>,
    /// Same, per player and record key
    pub damage_sub_segments: HashMap<IStr, HashMap<IStr, TimeSegment>>,
    pub tank_segments: HashMap<IStr, TimeSegment>,
    pub tank_sub_segments: HashMap<IStr, HashMap<IStr, TimeSegment>>,

    pub dd_damage: HashMap<(IStr, IStr), SpellDamageStats>,
    pub dot_damage: HashMap<(IStr, IStr), SpellDamageStats>,
    pub proc_damage: HashMap<(IStr, IStr), SpellDamageStats>,
}

impl Fight {
    pub fn new(id: i64, name: IStr, group_id: i32, time: f64) -> Self {
        Self {
            id,
            name,
            correct_map_key: name,
            group_id,
            begin_time: time,
            begin_time_string: format_begin_time(time),
            last_time: time,
            begin_damage_time: None,
            last_damage_time: None,
            begin_tanking_time: None,
            last_tanking_time: None,
            dead: false,
            damage_total: 0,
            damage_hits: 0,
            tank_total: 0,
            tank_hits: 0,
            player_damage_totals: HashMap::new(),
            player_tank_totals: HashMap::new(),
            damage_blocks: Vec::new(),
            tanking_blocks: Vec::new(),
            taunt_blocks: Vec::new(),
            damage_segments: HashMap::new(),
            damage_sub_segments: HashMap::new(),
            tank_segments: HashMap::new(),
            tank_sub_segments: HashMap::new(),
            dd_damage: HashMap::new(),
            dot_damage: HashMap::new(),
            proc_damage: HashMap::new(),
        }
    }

    pub fn snapshot(&self) -> FightSnapshot {
        FightSnapshot {
            id: self.id,
            name: self.name,
            group_id: self.group_id,
            begin_time: self.begin_time,
            begin_time_string: self.begin_time_string.clone(),
            last_time: self.last_time,
            begin_damage_time: self.begin_damage_time,
            last_damage_time: self.last_damage_time,
            dead: self.dead,
            damage_total: self.damage_total,
            damage_hits: self.damage_hits,
            tank_total: self.tank_total,
            tank_hits: self.tank_hits,
        }
    }

    /// Spell tally for the record's hit type, if it is tracked.
    pub(crate) fn spell_stats_mut(
        &mut self,
        hit_type: HitType,
        caster: IStr,
        spell: IStr,
    ) -> Option<&mut SpellDamageStats> {
        let map = match hit_type {
            HitType::DirectDamage => &mut self.dd_damage,
            HitType::DamageOverTime => &mut self.dot_damage,
            HitType::Proc => &mut self.proc_damage,
            _ => return None,
        };
        Some(map.entry((caster, spell)).or_insert_with(|| SpellDamageStats {
            caster,
            spell,
            count: 0,
            max: 0,
            total: 0,
        }))
    }
}

/// Header and running totals of a fight, without its blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct FightSnapshot {
    pub id: i64,
    pub name: IStr,
    pub group_id: i32,
    pub begin_time: f64,
    pub begin_time_string: String,
    pub last_time: f64,
    pub begin_damage_time: Option<f64>,
    pub last_damage_time: Option<f64>,
    pub dead: bool,
    pub damage_total: i64,
    pub damage_hits: u64,
    pub tank_total: i64,
    pub tank_hits: u64,
}

impl FightSnapshot {
    pub fn name_str(&self) -> &'static str {
        resolve(self.name)
    }
}

/// Key used for sub stats and sub segments. Direct damage and DoT ticks of the
/// same spell are kept apart ("DoT Tick=Flame Lick").
pub fn create_record_key(hit_type: HitType, sub_type: IStr) -> IStr {
    match hit_type {
        HitType::DirectDamage | HitType::DamageOverTime => {
            intern(&format!("{}={}", hit_type.label(), resolve(sub_type)))
        }
        _ => sub_type,
    }
}

/// Extend the player's segment and the player's per-key segment to `time`.
pub(crate) fn update_time_segments(
    segments: &mut HashMap<IStr, TimeSegment>,
    sub_segments: &mut HashMap<IStr, HashMap<IStr, TimeSegment>>,
    key: IStr,
    player: IStr,
    time: f64,
) {
    segments
        .entry(player)
        .and_modify(|s| s.end = time)
        .or_insert(TimeSegment::new(time, time));
    sub_segments
        .entry(player)
        .or_default()
        .entry(key)
        .and_modify(|s| s.end = time)
        .or_insert(TimeSegment::new(time, time));
}

/// "Oct 16 20:14:05" for epoch seconds; plain seconds when out of range.
pub fn format_begin_time(time: f64) -> String {
    DateTime::from_timestamp(time.floor() as i64, 0)
        .map(|dt| dt.format("%b %d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{time:.0}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keys_split_dd_and_dot() {
        let spell = intern("Flame Lick");
        assert_eq!(
            resolve(create_record_key(HitType::DamageOverTime, spell)),
            "DoT Tick=Flame Lick"
        );
        assert_eq!(
            resolve(create_record_key(HitType::DirectDamage, spell)),
            "Direct Damage=Flame Lick"
        );
        assert_eq!(create_record_key(HitType::Proc, spell), spell);
    }

    #[test]
    fn segments_extend_to_latest_time() {
        let mut segments = HashMap::new();
        let mut subs = HashMap::new();
        let alice = intern("Alice");
        let key = intern("Slashes");

        update_time_segments(&mut segments, &mut subs, key, alice, 10.0);
        update_time_segments(&mut segments, &mut subs, key, alice, 14.0);

        assert_eq!(segments[&alice], TimeSegment::new(10.0, 14.0));
        assert_eq!(subs[&alice][&key], TimeSegment::new(10.0, 14.0));
    }

    #[test]
    fn begin_time_formats_epoch_seconds() {
        assert_eq!(format_begin_time(0.0), "Jan 01 00:00:00");
        assert_eq!(format_begin_time(86_400.5), "Jan 02 00:00:00");
    }
}
