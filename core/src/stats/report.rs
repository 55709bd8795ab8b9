use std::collections::{BTreeMap, BTreeSet};

use fightlog_types::StatsDimension;
use serde::Serialize;

use super::player_stats::PlayerStats;
use crate::combat_log::{DamageRecord, HealRecord, HitRecord, HitType, Modifiers};
use crate::context::IStr;

/// A record as seen by the stats engine: damage for the damage and tanking
/// reports, healing for the healing report.
#[derive(Debug, Clone, PartialEq)]
pub enum StatsAction {
    Damage(DamageRecord),
    Heal(HealRecord),
}

impl StatsAction {
    /// Entity the record is credited to in `dimension`.
    pub fn actor(&self, dimension: StatsDimension) -> IStr {
        match (self, dimension) {
            (StatsAction::Damage(r), StatsDimension::Tanking) => r.defender,
            (StatsAction::Damage(r), _) => r.attacker,
            (StatsAction::Heal(r), _) => r.healer,
        }
    }

    pub fn as_damage(&self) -> Option<&DamageRecord> {
        match self {
            StatsAction::Damage(r) => Some(r),
            StatsAction::Heal(_) => None,
        }
    }
}

impl HitRecord for StatsAction {
    fn line_number(&self) -> u64 {
        match self {
            StatsAction::Damage(r) => r.line_number,
            StatsAction::Heal(r) => r.line_number,
        }
    }

    fn total(&self) -> i64 {
        match self {
            StatsAction::Damage(r) => r.total,
            StatsAction::Heal(r) => r.total,
        }
    }

    fn over_total(&self) -> i64 {
        match self {
            StatsAction::Damage(r) => r.over_total,
            StatsAction::Heal(r) => r.over_total,
        }
    }

    fn hit_type(&self) -> HitType {
        match self {
            StatsAction::Damage(r) => r.hit_type,
            StatsAction::Heal(r) => r.hit_type,
        }
    }

    fn sub_type(&self) -> IStr {
        match self {
            StatsAction::Damage(r) => r.sub_type,
            StatsAction::Heal(r) => r.sub_type,
        }
    }

    fn modifiers(&self) -> Modifiers {
        match self {
            StatsAction::Damage(r) => r.modifiers,
            StatsAction::Heal(r) => r.modifiers,
        }
    }
}

/// A finished report over one selection of fights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedStats {
    pub dimension: StatsDimension,
    /// "Orc" or "Combined (3): Orc"
    pub target_title: String,
    /// "in 42s"
    pub time_title: String,
    /// "1.2M Damage @28.5K"
    pub total_title: String,
    pub full_title: String,
    pub short_title: String,

    /// Synthetic "Totals" row; its seconds normalise SDPS and raid percentages
    pub raid_stats: PlayerStats,
    /// Top-level rows, highest total first
    pub stats_list: Vec<PlayerStats>,
    /// Top-level rows each followed by their children
    pub expanded_stats_list: Vec<PlayerStats>,
    /// "Owner +Pets" row name → the owner and pet rows it aggregates
    pub children: BTreeMap<String, Vec<PlayerStats>>,
    pub unique_classes: BTreeSet<String>,
    /// Some damage kinds were excluded by the validator settings
    pub limited: bool,
    pub unique_group_count: usize,
}

impl CombinedStats {
    pub fn find(&self, name: &str) -> Option<&PlayerStats> {
        self.expanded_stats_list.iter().find(|s| s.name() == name)
    }
}
