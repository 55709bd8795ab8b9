use std::ops::BitOr;

use phf::phf_map;

use crate::context::{IStr, empty_istr};

/// Category of a combat action, decoded from the record's type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HitType {
    #[default]
    Melee,
    DirectDamage,
    DamageOverTime,
    Proc,
    DamageShield,
    ReverseShield,
    Bane,
    Miss,
    Dodge,
    Parry,
    Riposte,
    Block,
    Absorb,
    Invulnerable,
    Heal,
    HealOverTime,
}

static HIT_TYPE_LABELS: phf::Map<&'static str, HitType> = phf_map! {
    "melee" => HitType::Melee,
    "direct damage" => HitType::DirectDamage,
    "dd" => HitType::DirectDamage,
    "dot tick" => HitType::DamageOverTime,
    "dot" => HitType::DamageOverTime,
    "proc" => HitType::Proc,
    "damage shield" => HitType::DamageShield,
    "ds" => HitType::DamageShield,
    "reverse ds" => HitType::ReverseShield,
    "rs" => HitType::ReverseShield,
    "bane" => HitType::Bane,
    "miss" => HitType::Miss,
    "dodge" => HitType::Dodge,
    "parry" => HitType::Parry,
    "riposte" => HitType::Riposte,
    "block" => HitType::Block,
    "absorb" => HitType::Absorb,
    "invulnerable" => HitType::Invulnerable,
    "heal" => HitType::Heal,
    "hot tick" => HitType::HealOverTime,
    "hot" => HitType::HealOverTime,
};

impl HitType {
    /// Look up a type label ("Direct Damage", "dot", "Riposte", ...).
    pub fn from_label(label: &str) -> Option<HitType> {
        HIT_TYPE_LABELS.get(label.to_ascii_lowercase().as_str()).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            HitType::Melee => "Melee",
            HitType::DirectDamage => "Direct Damage",
            HitType::DamageOverTime => "DoT Tick",
            HitType::Proc => "Proc",
            HitType::DamageShield => "Damage Shield",
            HitType::ReverseShield => "Reverse DS",
            HitType::Bane => "Bane",
            HitType::Miss => "Miss",
            HitType::Dodge => "Dodge",
            HitType::Parry => "Parry",
            HitType::Riposte => "Riposte",
            HitType::Block => "Block",
            HitType::Absorb => "Absorb",
            HitType::Invulnerable => "Invulnerable",
            HitType::Heal => "Heal",
            HitType::HealOverTime => "HoT Tick",
        }
    }

    /// False for avoided attacks (miss, dodge, parry, riposte, absorb, invulnerable).
    pub fn is_hit(&self) -> bool {
        !matches!(
            self,
            HitType::Miss
                | HitType::Dodge
                | HitType::Parry
                | HitType::Riposte
                | HitType::Absorb
                | HitType::Invulnerable
        )
    }

    /// Spell damage types remembered by the classifier's recent-spell cache.
    pub fn is_player_spell(&self) -> bool {
        matches!(
            self,
            HitType::DirectDamage | HitType::DamageOverTime | HitType::Proc
        )
    }
}

/// Bit set of hit modifiers (critical, lucky, twincast, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u32);

static MODIFIER_NAMES: phf::Map<&'static str, Modifiers> = phf_map! {
    "crit" => Modifiers::CRIT,
    "critical" => Modifiers::CRIT,
    "lucky" => Modifiers::LUCKY,
    "twincast" => Modifiers::TWINCAST,
    "strikethrough" => Modifiers::STRIKETHROUGH,
    "flurry" => Modifiers::FLURRY,
    "rampage" => Modifiers::RAMPAGE,
    "riposte" => Modifiers::RIPOSTE,
    "doublebow" => Modifiers::DOUBLE_BOW,
    "assassinate" => Modifiers::ASSASSINATE,
    "finishing" => Modifiers::FINISHING_BLOW,
    "headshot" => Modifiers::HEADSHOT,
    "slay" => Modifiers::SLAY_UNDEAD,
};

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const CRIT: Modifiers = Modifiers(1);
    pub const LUCKY: Modifiers = Modifiers(1 << 1);
    pub const TWINCAST: Modifiers = Modifiers(1 << 2);
    pub const STRIKETHROUGH: Modifiers = Modifiers(1 << 3);
    pub const FLURRY: Modifiers = Modifiers(1 << 4);
    pub const RAMPAGE: Modifiers = Modifiers(1 << 5);
    pub const RIPOSTE: Modifiers = Modifiers(1 << 6);
    pub const DOUBLE_BOW: Modifiers = Modifiers(1 << 7);
    pub const ASSASSINATE: Modifiers = Modifiers(1 << 8);
    pub const FINISHING_BLOW: Modifiers = Modifiers(1 << 9);
    pub const HEADSHOT: Modifiers = Modifiers(1 << 10);
    pub const SLAY_UNDEAD: Modifiers = Modifiers(1 << 11);

    pub fn from_name(name: &str) -> Option<Modifiers> {
        MODIFIER_NAMES.get(name.to_ascii_lowercase().as_str()).copied()
    }

    #[inline]
    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// Shared view of damage and heal records used by the stats engine.
pub trait HitRecord {
    fn line_number(&self) -> u64;
    fn total(&self) -> i64;
    fn over_total(&self) -> i64;
    fn hit_type(&self) -> HitType;
    fn sub_type(&self) -> IStr;
    fn modifiers(&self) -> Modifiers;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DamageRecord {
    pub line_number: u64,
    pub attacker: IStr,
    /// Owner reported by the parser when the attacker is a pet
    pub attacker_owner: Option<IStr>,
    pub defender: IStr,
    pub total: i64,
    /// Amount before absorption (0 when unknown)
    pub over_total: i64,
    pub hit_type: HitType,
    /// Spell name or melee verb
    pub sub_type: IStr,
    pub modifiers: Modifiers,
    /// The attacker field names a spell rather than a caster
    pub attacker_is_spell: bool,
}

impl Default for DamageRecord {
    fn default() -> Self {
        Self {
            line_number: 0,
            attacker: empty_istr(),
            attacker_owner: None,
            defender: empty_istr(),
            total: 0,
            over_total: 0,
            hit_type: HitType::default(),
            sub_type: empty_istr(),
            modifiers: Modifiers::NONE,
            attacker_is_spell: false,
        }
    }
}

impl HitRecord for DamageRecord {
    fn line_number(&self) -> u64 {
        self.line_number
    }
    fn total(&self) -> i64 {
        self.total
    }
    fn over_total(&self) -> i64 {
        self.over_total
    }
    fn hit_type(&self) -> HitType {
        self.hit_type
    }
    fn sub_type(&self) -> IStr {
        self.sub_type
    }
    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HealRecord {
    pub line_number: u64,
    pub healer: IStr,
    pub healed: IStr,
    pub total: i64,
    /// Full heal amount including overheal
    pub over_total: i64,
    pub hit_type: HitType,
    pub sub_type: IStr,
    pub modifiers: Modifiers,
}

impl Default for HealRecord {
    fn default() -> Self {
        Self {
            line_number: 0,
            healer: empty_istr(),
            healed: empty_istr(),
            total: 0,
            over_total: 0,
            hit_type: HitType::Heal,
            sub_type: empty_istr(),
            modifiers: Modifiers::NONE,
        }
    }
}

impl HitRecord for HealRecord {
    fn line_number(&self) -> u64 {
        self.line_number
    }
    fn total(&self) -> i64 {
        self.total
    }
    fn over_total(&self) -> i64 {
        self.over_total
    }
    fn hit_type(&self) -> HitType {
        self.hit_type
    }
    fn sub_type(&self) -> IStr {
        self.sub_type
    }
    fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TauntRecord {
    pub line_number: u64,
    pub player: IStr,
    pub npc: IStr,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogAction {
    Damage(DamageRecord),
    Heal(HealRecord),
    Taunt(TauntRecord),
}

/// One decoded record with its timestamp in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct CombatEvent {
    pub line_number: u64,
    pub timestamp: f64,
    pub action: LogAction,
}
