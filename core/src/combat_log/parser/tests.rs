use super::*;
use crate::context::resolve;

fn parse(line: &str) -> Result<Option<CombatEvent>, ParseError> {
    RecordParser::new().parse_line(7, line)
}

#[test]
fn test_parse_damage_line() {
    let event = parse("12.5\tD\tAlice\tOrc\t300\t320\tDirect Damage\tFireball\tcrit,twincast")
        .unwrap()
        .unwrap();

    assert_eq!(event.line_number, 7);
    assert_eq!(event.timestamp, 12.5);
    let LogAction::Damage(record) = event.action else {
        panic!("expected damage");
    };
    assert_eq!(resolve(record.attacker), "Alice");
    assert_eq!(resolve(record.defender), "Orc");
    assert_eq!(record.total, 300);
    assert_eq!(record.over_total, 320);
    assert_eq!(record.hit_type, HitType::DirectDamage);
    assert_eq!(resolve(record.sub_type), "Fireball");
    assert!(record.modifiers.contains(Modifiers::CRIT));
    assert!(record.modifiers.contains(Modifiers::TWINCAST));
    assert!(!record.modifiers.contains(Modifiers::LUCKY));
    assert!(!record.attacker_is_spell);
    assert_eq!(record.attacker_owner, None);
    assert_eq!(record.line_number, 7);
}

#[test]
fn test_parse_damage_with_owner_and_spell_flag() {
    let event = parse("3\tD\tFlame Lick\tOrc\t50\t0\tdot\tFlame Lick\tspell\tBob")
        .unwrap()
        .unwrap();

    let LogAction::Damage(record) = event.action else {
        panic!("expected damage");
    };
    assert!(record.attacker_is_spell);
    assert!(record.modifiers.is_empty());
    assert_eq!(record.hit_type, HitType::DamageOverTime);
    assert_eq!(record.attacker_owner.map(resolve), Some("Bob"));
}

#[test]
fn test_parse_unknown_hit_type_falls_back() {
    let hit = parse("1\tD\tOrc\tAlice\t10\t0\tSlashes\tslashes\t-").unwrap().unwrap();
    let miss = parse("1\tD\tOrc\tAlice\t0\t0\tSlashes\tslashes\t-").unwrap().unwrap();

    let (LogAction::Damage(hit), LogAction::Damage(miss)) = (hit.action, miss.action) else {
        panic!("expected damage");
    };
    assert_eq!(hit.hit_type, HitType::Melee);
    assert_eq!(miss.hit_type, HitType::Miss);
}

#[test]
fn test_parse_heal_and_taunt() {
    let heal = parse("4\tH\tCleric\tAlice\t200\t250\tHoT Tick\tElixir\t-").unwrap().unwrap();
    let LogAction::Heal(heal) = heal.action else {
        panic!("expected heal");
    };
    assert_eq!(heal.hit_type, HitType::HealOverTime);
    assert_eq!(heal.over_total, 250);

    let taunt = parse("5\tT\tWarrior\tOrc\t1").unwrap().unwrap();
    let LogAction::Taunt(taunt) = taunt.action else {
        panic!("expected taunt");
    };
    assert!(taunt.success);
    assert_eq!(resolve(taunt.npc), "Orc");
}

#[test]
fn test_parse_skips_comments_and_blank_lines() {
    assert!(parse("# header").unwrap().is_none());
    assert!(parse("   ").unwrap().is_none());
    assert!(parse("\r\n").unwrap().is_none());
}

#[test]
fn test_parse_errors_carry_line_number() {
    match parse("abc\tD\tA\tB\t1\t0\tdd\tx\t-") {
        Err(ParseError::InvalidTimestamp { line_number, .. }) => assert_eq!(line_number, 7),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        parse("1\tX\tA\tB\t1"),
        Err(ParseError::InvalidKind { .. })
    ));
    assert!(matches!(
        parse("1\tD\tA\tB\t1"),
        Err(ParseError::InvalidLineFormat { expected: 9, found: 5, .. })
    ));
    assert!(matches!(
        parse("1\tD\tA\tB\tlots\t0\tdd\tx\t-"),
        Err(ParseError::InvalidValue { .. })
    ));
    assert!(matches!(
        parse("1\tD\tA\tB\t1\t0\tdd\tx\tsparkly"),
        Err(ParseError::InvalidValue { .. })
    ));
    assert!(matches!(
        parse("1\tT\tA\tB\tyes"),
        Err(ParseError::InvalidValue { .. })
    ));
}

#[test]
fn test_hit_type_labels() {
    assert_eq!(HitType::from_label("Reverse DS"), Some(HitType::ReverseShield));
    assert_eq!(HitType::from_label("RIPOSTE"), Some(HitType::Riposte));
    assert_eq!(HitType::from_label("nonsense"), None);
    assert!(!HitType::Dodge.is_hit());
    assert!(HitType::Bane.is_hit());
    assert!(HitType::Proc.is_player_spell());
    assert!(!HitType::Melee.is_player_spell());
}
