//! Shared configuration types for fightlog
//!
//! This crate contains serializable configuration types and small shared enums
//! used by fightlog-core and the front ends. Persistence lives in core via the
//! `AppConfigExt` trait.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Stats Dimensions
// ─────────────────────────────────────────────────────────────────────────────

/// Which side of the combat records a stats report aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatsDimension {
    /// Damage dealt to the selected fights, grouped by attacker
    #[default]
    Damage,
    /// Damage taken from the selected fights, grouped by defender
    Tanking,
    /// Healing done during the selected fights, grouped by healer
    Healing,
}

impl StatsDimension {
    pub const ALL: [StatsDimension; 3] = [
        StatsDimension::Damage,
        StatsDimension::Tanking,
        StatsDimension::Healing,
    ];

    /// Label used in report titles ("1.2K Damage @40")
    pub fn label(&self) -> &'static str {
        match self {
            StatsDimension::Damage => "Damage",
            StatsDimension::Tanking => "Tanked",
            StatsDimension::Healing => "Healed",
        }
    }

    /// Rate column label
    pub fn rate_label(&self) -> &'static str {
        match self {
            StatsDimension::Damage => "DPS",
            StatsDimension::Tanking => "DTPS",
            StatsDimension::Healing => "HPS",
        }
    }

    /// Parse a user supplied name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "damage" | "dps" => Some(StatsDimension::Damage),
            "tanking" | "tank" | "dtps" => Some(StatsDimension::Tanking),
            "healing" | "heal" | "hps" => Some(StatsDimension::Healing),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fight Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Timeouts that drive fight expiry and classifier cache eviction.
/// All values are in log time units (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightSettings {
    /// Inactivity after which a fight with recorded damage expires
    #[serde(default = "default_fight_timeout")]
    pub fight_timeout_secs: f64,

    /// Inactivity after which any fight expires
    #[serde(default = "default_max_timeout")]
    pub max_timeout_secs: f64,

    /// Inactivity after which a fight drops off the overlay registry
    #[serde(default = "default_overlay_timeout")]
    pub overlay_timeout_secs: f64,

    /// Gap between ticks after which remembered player spells are forgotten
    #[serde(default = "default_recent_spell")]
    pub recent_spell_secs: f64,
}

fn default_fight_timeout() -> f64 {
    30.0
}

fn default_max_timeout() -> f64 {
    60.0
}

fn default_overlay_timeout() -> f64 {
    120.0
}

fn default_recent_spell() -> f64 {
    300.0
}

impl Default for FightSettings {
    fn default() -> Self {
        Self {
            fight_timeout_secs: default_fight_timeout(),
            max_timeout_secs: default_max_timeout(),
            overlay_timeout_secs: default_overlay_timeout(),
            recent_spell_secs: default_recent_spell(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Which special damage kinds count toward totals.
///
/// Disabling a kind removes those hits from reports; the report is then
/// flagged as limited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSettings {
    #[serde(default = "default_true")]
    pub assassinate: bool,
    #[serde(default = "default_true")]
    pub bane: bool,
    #[serde(default = "default_true")]
    pub damage_shield: bool,
    #[serde(default = "default_true")]
    pub finishing_blow: bool,
    #[serde(default = "default_true")]
    pub headshot: bool,
    #[serde(default = "default_true")]
    pub slay_undead: bool,

    /// Hits above this amount are treated as corrupt and ignored
    #[serde(default = "default_max_hit")]
    pub max_hit: i64,
}

fn default_true() -> bool {
    true
}

fn default_max_hit() -> i64 {
    2_000_000_000
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            assassinate: true,
            bane: true,
            damage_shield: true,
            finishing_blow: true,
            headshot: true,
            slay_undead: true,
            max_hit: default_max_hit(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App Config
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level application configuration.
///
/// Persistence methods (load/save) are provided by fightlog-core via the
/// `AppConfigExt` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory searched for relative record file paths
    #[serde(default)]
    pub record_directory: String,

    #[serde(default)]
    pub fights: FightSettings,

    #[serde(default)]
    pub validator: ValidatorSettings,

    /// Buffer size of the fight and generation signal channels
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,
}

fn default_signal_capacity() -> usize {
    256
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            record_directory: String::new(),
            fights: FightSettings::default(),
            validator: ValidatorSettings::default(),
            signal_capacity: default_signal_capacity(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfig with the specified record directory.
    /// Other fields use their default values.
    pub fn with_record_directory(record_directory: String) -> Self {
        Self {
            record_directory,
            ..Default::default()
        }
    }
}
