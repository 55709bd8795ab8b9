//! Report generation over fights built by the write path.

use std::sync::Arc;

use fightlog_types::{FightSettings, StatsDimension, ValidatorSettings};

use super::*;
use crate::combat_log::{CombatEvent, DamageRecord, HealRecord, HitType, LogAction, Modifiers};
use crate::context::intern;
use crate::encounter::{FightLifecycle, FightProcessor, HealLog, SharedFight};
use crate::players::PlayerRegistry;

struct Harness {
    registry: Arc<PlayerRegistry>,
    lifecycle: Arc<FightLifecycle>,
    heal_log: Arc<HealLog>,
    processor: FightProcessor,
    line: u64,
}

impl Harness {
    fn new() -> Self {
        let settings = FightSettings::default();
        let registry = Arc::new(PlayerRegistry::new());
        let lifecycle = Arc::new(FightLifecycle::new(settings.clone(), ValidatorSettings::default(), 64));
        let heal_log = Arc::new(HealLog::new());
        let processor = FightProcessor::new(
            Arc::clone(&registry),
            Arc::clone(&lifecycle),
            Arc::clone(&heal_log),
            &settings,
        );
        registry.add_verified_player(intern("Alice"), 0.0);
        registry.add_verified_player(intern("Cleric"), 0.0);
        Self {
            registry,
            lifecycle,
            heal_log,
            processor,
            line: 0,
        }
    }

    fn engine(&self, dimension: StatsDimension) -> StatsAggregationEngine {
        self.engine_with(dimension, ValidatorSettings::default())
    }

    fn engine_with(&self, dimension: StatsDimension, validator: ValidatorSettings) -> StatsAggregationEngine {
        StatsAggregationEngine::new(
            dimension,
            Arc::clone(&self.registry),
            Arc::clone(&self.heal_log),
            validator,
            16,
        )
    }

    fn hit(&mut self, time: f64, attacker: &str, defender: &str, total: i64, hit_type: HitType) {
        self.line += 1;
        let record = DamageRecord {
            line_number: self.line,
            attacker: intern(attacker),
            defender: intern(defender),
            total,
            hit_type,
            sub_type: intern("Slashes"),
            ..Default::default()
        };
        self.processor
            .process_event(CombatEvent {
                line_number: self.line,
                timestamp: time,
                action: LogAction::Damage(record),
            })
            .unwrap();
    }

    fn melee(&mut self, time: f64, attacker: &str, defender: &str, total: i64) {
        self.hit(time, attacker, defender, total, HitType::Melee);
    }

    fn heal(&mut self, time: f64, healer: &str, healed: &str, total: i64) {
        self.line += 1;
        let record = HealRecord {
            line_number: self.line,
            healer: intern(healer),
            healed: intern(healed),
            total,
            sub_type: intern("Light"),
            ..Default::default()
        };
        self.processor
            .process_event(CombatEvent {
                line_number: self.line,
                timestamp: time,
                action: LogAction::Heal(record),
            })
            .unwrap();
    }

    fn fights(&self) -> Vec<SharedFight> {
        self.lifecycle.fights()
    }

    /// Alice hits the Orc for 100 on three consecutive seconds.
    fn alice_vs_orc() -> Self {
        let mut h = Harness::new();
        h.melee(100.0, "Alice", "Orc", 100);
        h.melee(101.0, "Alice", "Orc", 100);
        h.melee(102.0, "Alice", "Orc", 100);
        h
    }
}

fn completed(outcome: StatsOutcome) -> Arc<CombinedStats> {
    match outcome {
        StatsOutcome::Completed(stats) => stats,
        other => panic!("expected completed stats, got {other:?}"),
    }
}

#[test]
fn alice_orc_report() {
    let h = Harness::alice_vs_orc();
    let engine = h.engine(StatsDimension::Damage);

    let stats = completed(engine.build(&h.fights(), None, None));
    assert_eq!(stats.full_title, "Orc in 3s, 300 Damage @100");
    assert_eq!(stats.short_title, "Orc in 3s");
    assert_eq!(stats.raid_stats.name(), "Totals");
    assert_eq!(stats.raid_stats.summary.total, 300);
    assert_eq!(stats.raid_stats.summary.total_seconds, 3.0);
    assert_eq!(stats.unique_group_count, 1);
    assert!(!stats.limited);

    assert_eq!(stats.stats_list.len(), 1);
    let alice = &stats.stats_list[0];
    assert_eq!(alice.name(), "Alice");
    assert_eq!(alice.summary.rank, 1);
    assert_eq!(alice.summary.total, 300);
    assert_eq!(alice.summary.hits, 3);
    assert_eq!(alice.summary.total_seconds, 3.0);
    assert_eq!(alice.summary.dps, 100);
    assert_eq!(alice.summary.sdps, 100);
    assert_eq!(alice.summary.percent, 100.0);
    assert_eq!(alice.summary.percent_of_raid, 100.0);
    assert_eq!(alice.sub_stats.len(), 1);
    assert_eq!(alice.sub_stats[0].name, "Slashes");
    assert_eq!(alice.sub_stats[0].non_crit_freq.get(&100), Some(&3));

    assert_eq!(engine.last_stats().as_deref(), Some(&*stats));
    assert_eq!(engine.chart_groups().len(), 1);
    assert_eq!(engine.chart_groups()[0].len(), 3);
}

#[test]
fn ranking_is_by_total_then_name() {
    let mut h = Harness::new();
    h.registry.add_verified_player(intern("Bob"), 0.0);
    h.registry.add_verified_player(intern("Carol"), 0.0);
    h.melee(10.0, "Bob", "Orc", 50);
    h.melee(10.0, "Carol", "Orc", 200);
    h.melee(11.0, "Alice", "Orc", 50);

    let stats = completed(h.engine(StatsDimension::Damage).build(&h.fights(), None, None));
    let names: Vec<&str> = stats.stats_list.iter().map(|s| s.name()).collect();
    assert_eq!(names, ["Carol", "Alice", "Bob"]);
    let ranks: Vec<u16> = stats.stats_list.iter().map(|s| s.summary.rank).collect();
    assert_eq!(ranks, [1, 2, 3]);
    assert_eq!(stats.stats_list[0].summary.percent_of_raid, 66.67);
}

#[test]
fn same_selection_gives_same_report() {
    let mut h = Harness::new();
    h.registry.add_verified_player(intern("Bob"), 0.0);
    for t in 0..20 {
        let time = t as f64;
        h.melee(time, "Alice", "Orc", 100 + t);
        h.melee(time, "Bob", "Orc", 90);
        h.melee(time, "Alice", "Goblin", 40);
    }

    let engine = h.engine(StatsDimension::Damage);
    let first = completed(engine.build(&h.fights(), None, None));
    let second = completed(engine.build(&h.fights(), None, None));
    assert_eq!(*first, *second);
    assert_eq!(first.target_title, "Combined (2): Orc");
}

#[test]
fn pets_roll_up_under_owner() {
    let mut h = Harness::new();
    h.registry.set_player_class(intern("Alice"), intern("Magician"));
    h.registry.add_verified_pet(intern("Fido"));
    h.registry.add_pet_to_player(intern("Fido"), intern("Alice"));

    h.melee(1.0, "Alice", "Orc", 300);
    h.melee(2.0, "Fido", "Orc", 100);

    let stats = completed(h.engine(StatsDimension::Damage).build(&h.fights(), None, None));
    assert_eq!(stats.stats_list.len(), 1);
    let top = &stats.stats_list[0];
    assert_eq!(top.name(), "Alice +Pets");
    assert_eq!(top.orig_name, "Alice");
    assert_eq!(top.class_name, "Magician");
    assert_eq!(top.total(), 400);
    assert!(top.is_top_level);

    let kids = &stats.children["Alice +Pets"];
    assert_eq!(kids.len(), 2);
    assert_eq!(kids[0].name(), "Alice");
    assert_eq!(kids[0].summary.percent, 75.0);
    assert!(!kids[0].is_top_level);
    assert_eq!(kids[1].name(), "Fido");
    assert_eq!(kids[1].orig_name, "Alice");
    assert_eq!(kids[1].summary.percent, 25.0);

    let expanded: Vec<&str> = stats.expanded_stats_list.iter().map(|s| s.name()).collect();
    assert_eq!(expanded, ["Alice +Pets", "Alice", "Fido"]);
    assert!(stats.unique_classes.contains("Magician"));
}

#[test]
fn empty_selection_is_no_npc() {
    let h = Harness::new();
    let engine = h.engine(StatsDimension::Damage);
    let mut events = engine.subscribe();

    assert!(matches!(engine.build(&[], None, None), StatsOutcome::NoNpc));
    assert_eq!(events.try_recv().unwrap().state, GenerationState::Started);
    assert_eq!(events.try_recv().unwrap().state, GenerationState::NoNpc);
    assert!(matches!(engine.rebuild(None, None), StatsOutcome::NoNpc));
}

#[test]
fn fight_without_damage_is_no_data() {
    let mut h = Harness::new();
    h.melee(5.0, "Orc", "Alice", 70);

    let fights = h.fights();
    assert_eq!(fights.len(), 1);

    let damage = h.engine(StatsDimension::Damage);
    let mut events = damage.subscribe();
    assert!(matches!(damage.build(&fights, None, None), StatsOutcome::NoData));
    assert_eq!(events.try_recv().unwrap().state, GenerationState::Started);
    assert_eq!(events.try_recv().unwrap().state, GenerationState::NoData);
    assert!(damage.last_stats().is_none());

    let tanking = completed(h.engine(StatsDimension::Tanking).build(&fights, None, None));
    assert_eq!(tanking.full_title, "Orc in 1s, 70 Tanked @70");
    assert_eq!(tanking.stats_list[0].name(), "Alice");
}

#[test]
fn window_narrows_report() {
    let h = Harness::alice_vs_orc();
    let engine = h.engine(StatsDimension::Damage);
    completed(engine.build(&h.fights(), None, None));

    let narrowed = completed(engine.rebuild(Some(1.0), Some(2.0)));
    assert_eq!(narrowed.full_title, "Orc in 1s, 100 Damage @100");
    assert_eq!(narrowed.stats_list[0].summary.total_seconds, 1.0);
    assert_eq!(engine.chart_groups()[0].len(), 1);

    // a window covering everything is no window
    let full = completed(engine.rebuild(Some(0.0), Some(3.0)));
    assert_eq!(full.full_title, "Orc in 3s, 300 Damage @100");
}

#[test]
fn window_past_the_end_is_no_data() {
    let h = Harness::alice_vs_orc();
    let engine = h.engine(StatsDimension::Damage);
    completed(engine.build(&h.fights(), None, None));
    assert!(matches!(engine.rebuild(Some(2.5), None), StatsOutcome::NoData));
}

#[test]
fn excluded_bane_counts_hits_only() {
    let mut h = Harness::new();
    h.melee(1.0, "Alice", "Orc", 100);
    h.hit(2.0, "Alice", "Orc", 5000, HitType::Bane);

    let validator = ValidatorSettings {
        bane: false,
        ..Default::default()
    };
    let engine = h.engine_with(StatsDimension::Damage, validator);
    let mut events = engine.subscribe();
    let stats = completed(engine.build(&h.fights(), None, None));

    assert!(stats.limited);
    assert_eq!(stats.raid_stats.summary.total, 100);
    assert_eq!(stats.raid_stats.summary.bane_hits, 1);
    assert_eq!(stats.stats_list[0].summary.bane_hits, 1);
    assert_eq!(stats.stats_list[0].summary.hits, 1);

    assert_eq!(events.try_recv().unwrap().state, GenerationState::Started);
    let done = events.try_recv().unwrap();
    assert_eq!(done.state, GenerationState::Completed);
    assert!(done.limited);
    assert_eq!(done.combined.as_deref(), Some(&*stats));
}

#[test]
fn crits_land_in_crit_histogram() {
    let mut h = Harness::new();
    h.line += 1;
    let record = DamageRecord {
        line_number: h.line,
        attacker: intern("Alice"),
        defender: intern("Orc"),
        total: 250,
        hit_type: HitType::Melee,
        sub_type: intern("Slashes"),
        modifiers: Modifiers::CRIT,
        ..Default::default()
    };
    h.processor
        .process_event(CombatEvent {
            line_number: h.line,
            timestamp: 1.0,
            action: LogAction::Damage(record),
        })
        .unwrap();
    h.melee(1.0, "Alice", "Orc", 100);

    let stats = completed(h.engine(StatsDimension::Damage).build(&h.fights(), None, None));
    let sub = &stats.stats_list[0].sub_stats[0];
    assert_eq!(sub.crit_freq.get(&250), Some(&1));
    assert_eq!(sub.non_crit_freq.get(&100), Some(&1));
    assert_eq!(stats.stats_list[0].summary.crit_rate, 50.0);
}

#[test]
fn healing_uses_heals_inside_fights() {
    let mut h = Harness::alice_vs_orc();
    h.heal(101.0, "Cleric", "Alice", 500);
    h.heal(300.0, "Cleric", "Alice", 9000);

    let stats = completed(h.engine(StatsDimension::Healing).build(&h.fights(), None, None));
    assert_eq!(stats.full_title, "Orc in 3s, 500 Healed @166");
    let cleric = &stats.stats_list[0];
    assert_eq!(cleric.name(), "Cleric");
    assert_eq!(cleric.summary.total, 500);
    assert_eq!(cleric.summary.total_seconds, 1.0);
    assert_eq!(cleric.summary.dps, 500);
    assert!(!stats.limited);
}

#[test]
fn reset_forgets_selection() {
    let h = Harness::alice_vs_orc();
    let engine = h.engine(StatsDimension::Damage);
    completed(engine.build(&h.fights(), None, None));

    engine.reset();
    assert!(engine.last_stats().is_none());
    assert!(engine.chart_groups().is_empty());
    assert!(matches!(engine.rebuild(None, None), StatsOutcome::NoNpc));
}

#[test]
fn fight_starting_at_zero_rates_per_second() {
    let mut h = Harness::new();
    h.melee(0.0, "Alice", "Orc", 100);
    h.melee(1.0, "Alice", "Orc", 150);
    h.melee(2.0, "Alice", "Orc", 50);

    let fights = h.fights();
    assert_eq!(fights.len(), 1);
    assert_eq!(fights[0].read().unwrap().begin_time, 0.0);

    let stats = completed(h.engine(StatsDimension::Damage).build(&fights, None, None));
    assert_eq!(stats.full_title, "Orc in 3s, 300 Damage @100");
    assert_eq!(stats.raid_stats.summary.total, 300);
    assert_eq!(stats.raid_stats.summary.total_seconds, 3.0);
    assert_eq!(stats.raid_stats.summary.dps, 100);

    let alice = &stats.stats_list[0];
    assert_eq!(alice.name(), "Alice");
    assert_eq!(alice.summary.total, 300);
    assert_eq!(alice.summary.dps, 100);
    assert_eq!(alice.summary.hits, 3);
}

#[test]
fn huge_absorbed_amounts_do_not_fail_the_report() {
    let mut h = Harness::new();
    for time in [1.0, 2.0] {
        h.line += 1;
        let record = DamageRecord {
            line_number: h.line,
            attacker: intern("Alice"),
            defender: intern("Orc"),
            total: 100,
            over_total: i64::MAX,
            hit_type: HitType::Melee,
            sub_type: intern("Slashes"),
            ..Default::default()
        };
        h.processor
            .process_event(CombatEvent {
                line_number: h.line,
                timestamp: time,
                action: LogAction::Damage(record),
            })
            .unwrap();
    }

    let engine = h.engine(StatsDimension::Damage);
    let stats = completed(engine.build(&h.fights(), None, None));
    let alice = &stats.stats_list[0];
    assert_eq!(alice.summary.total, 200);
    assert_eq!(alice.summary.extra, i64::MAX);
    assert_eq!(alice.summary.potential, i64::MAX);

    assert!(matches!(engine.build(&[], None, None), StatsOutcome::NoNpc));
}
