use fightlog_types::ValidatorSettings;
use hashbrown::HashSet;

use crate::combat_log::{DamageRecord, HitType, Modifiers};
use crate::context::{IStr, eq_ignore_case};

/// Outcome of validating one damage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// Bane damage while bane is excluded; still counted as a bane hit
    BaneExcluded,
    Rejected,
}

/// Decides which damage records count toward totals.
///
/// Settings are captured once so a whole aggregation run sees the same gates.
#[derive(Debug, Clone)]
pub struct DamageValidator {
    settings: ValidatorSettings,
    seen: HashSet<(u64, IStr, IStr, IStr, i64)>,
}

impl DamageValidator {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self {
            settings,
            seen: HashSet::new(),
        }
    }

    /// Stateless check of the configured gates, self damage and the hit cap.
    pub fn check(&self, record: &DamageRecord) -> Verdict {
        if eq_ignore_case(record.attacker, record.defender) || record.total > self.settings.max_hit {
            return Verdict::Rejected;
        }

        let m = record.modifiers;
        if (m.contains(Modifiers::ASSASSINATE) && !self.settings.assassinate)
            || (record.hit_type == HitType::DamageShield && !self.settings.damage_shield)
            || (m.contains(Modifiers::FINISHING_BLOW) && !self.settings.finishing_blow)
            || (m.contains(Modifiers::HEADSHOT) && !self.settings.headshot)
            || (m.contains(Modifiers::SLAY_UNDEAD) && !self.settings.slay_undead)
        {
            return Verdict::Rejected;
        }

        if record.hit_type == HitType::Bane && !self.settings.bane {
            return Verdict::BaneExcluded;
        }

        Verdict::Valid
    }

    pub fn is_valid(&self, record: &DamageRecord) -> bool {
        self.check(record) == Verdict::Valid
    }

    /// Like [`check`](Self::check) but also rejects a record already seen in
    /// this run.
    pub fn accept(&mut self, record: &DamageRecord) -> Verdict {
        let key = (
            record.line_number,
            record.attacker,
            record.defender,
            record.sub_type,
            record.total,
        );
        if record.line_number > 0 && !self.seen.insert(key) {
            return Verdict::Rejected;
        }
        self.check(record)
    }

    /// True when any damage kind is excluded.
    pub fn is_limited(&self) -> bool {
        let s = &self.settings;
        !s.assassinate || !s.bane || !s.damage_shield || !s.finishing_blow || !s.headshot || !s.slay_undead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::intern;

    fn hit(attacker: &str, defender: &str, total: i64) -> DamageRecord {
        DamageRecord {
            line_number: 1,
            attacker: intern(attacker),
            defender: intern(defender),
            total,
            hit_type: HitType::DirectDamage,
            sub_type: intern("Fireball"),
            ..Default::default()
        }
    }

    #[test]
    fn default_settings_accept_ordinary_hits() {
        let validator = DamageValidator::new(ValidatorSettings::default());
        assert!(validator.is_valid(&hit("Alice", "Orc", 100)));
        assert!(!validator.is_limited());
    }

    #[test]
    fn rejects_self_damage_and_oversized_hits() {
        let validator = DamageValidator::new(ValidatorSettings {
            max_hit: 1000,
            ..Default::default()
        });
        assert_eq!(validator.check(&hit("Orc", "orc", 5)), Verdict::Rejected);
        assert_eq!(validator.check(&hit("Alice", "Orc", 1001)), Verdict::Rejected);
    }

    #[test]
    fn gates_exclude_special_damage() {
        let validator = DamageValidator::new(ValidatorSettings {
            bane: false,
            headshot: false,
            ..Default::default()
        });
        assert!(validator.is_limited());

        let mut bane = hit("Alice", "Orc", 50);
        bane.hit_type = HitType::Bane;
        assert_eq!(validator.check(&bane), Verdict::BaneExcluded);

        let mut headshot = hit("Alice", "Orc", 50);
        headshot.modifiers = Modifiers::HEADSHOT | Modifiers::CRIT;
        assert_eq!(validator.check(&headshot), Verdict::Rejected);
    }

    #[test]
    fn duplicate_records_rejected_once_seen() {
        let mut validator = DamageValidator::new(ValidatorSettings::default());
        let record = hit("Alice", "Orc", 100);
        assert_eq!(validator.accept(&record), Verdict::Valid);
        assert_eq!(validator.accept(&record), Verdict::Rejected);

        let mut other_line = record.clone();
        other_line.line_number = 2;
        assert_eq!(validator.accept(&other_line), Verdict::Valid);
    }
}
