use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use fightlog_types::{StatsDimension, ValidatorSettings};
use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use super::calc::{format_title, percent, target_title, time_title, total_title, window_applies, window_bounds};
use super::error::StatsError;
use super::generation::{GenerationState, StatsGenerationEvent, StatsOutcome};
use super::player_stats::{PlayerStats, PlayerSubStats};
use super::report::{CombinedStats, StatsAction};
use super::validator::{DamageValidator, Verdict};
use crate::combat_log::{ActionGroup, HitRecord, Modifiers};
use crate::context::{IStr, intern, resolve};
use crate::encounter::{Fight, HealLog, SharedFight, create_record_key};
use crate::players::{PlayerRegistry, UNASSIGNED};
use crate::timeline::{TimeRange, TimeSegment};

/// Blocks of one report, split per raid time segment.
pub type StatsGroups = Vec<Vec<ActionGroup<StatsAction>>>;

const RAID_TOTALS: &str = "Totals";

fn aggregate_name(owner: IStr) -> String {
    format!("{} +Pets", resolve(owner))
}

// ─────────────────────────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a report needs, copied out of the selected fights so the
/// computation never holds a fight lock.
#[derive(Debug, Default)]
struct Selection {
    target: String,
    fight_count: usize,
    groups: StatsGroups,
    raid: TimeRange,
    ranges: HashMap<IStr, TimeRange>,
    sub_ranges: HashMap<(IStr, IStr), TimeRange>,
    /// Pet → owner for pets acting in the selection (damage only)
    pet_owners: HashMap<IStr, IStr>,
}

impl Selection {
    fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.is_empty())
    }

    fn range_of<K: Eq + Hash>(ranges: &HashMap<K, TimeRange>, keys: impl Iterator<Item = K>) -> TimeRange {
        keys.filter_map(|k| ranges.get(&k))
            .flat_map(|r| r.segments().iter().copied())
            .collect()
    }
}

struct FightCopy {
    id: i64,
    name: IStr,
    segment: Option<TimeSegment>,
    blocks: Vec<ActionGroup<StatsAction>>,
    segments: Vec<(IStr, TimeSegment)>,
    sub_segments: Vec<((IStr, IStr), TimeSegment)>,
}

#[derive(Default)]
struct EngineState {
    selection: Option<Arc<Selection>>,
    last_stats: Option<Arc<CombinedStats>>,
    last_groups: Arc<StatsGroups>,
}

enum RunOutcome {
    Completed(Arc<CombinedStats>),
    NoData,
    NoNpc,
    Superseded,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Builds ranked per-player reports for one dimension.
///
/// Requests serialize on the state lock. Every request bumps the generation
/// counter first, so a run that finds a newer generation at a checkpoint
/// gives up without publishing anything.
pub struct StatsAggregationEngine {
    dimension: StatsDimension,
    registry: Arc<PlayerRegistry>,
    heal_log: Arc<HealLog>,
    validator: ValidatorSettings,
    generation: AtomicU64,
    state: Mutex<EngineState>,
    events: broadcast::Sender<StatsGenerationEvent>,
}

impl StatsAggregationEngine {
    pub fn new(
        dimension: StatsDimension,
        registry: Arc<PlayerRegistry>,
        heal_log: Arc<HealLog>,
        validator: ValidatorSettings,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            dimension,
            registry,
            heal_log,
            validator,
            generation: AtomicU64::new(0),
            state: Mutex::new(EngineState::default()),
            events,
        }
    }

    pub fn dimension(&self) -> StatsDimension {
        self.dimension
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatsGenerationEvent> {
        self.events.subscribe()
    }

    /// Report over `fights`, optionally narrowed to `[min, max]` seconds into
    /// the combined fight time.
    pub fn build(&self, fights: &[SharedFight], min: Option<f64>, max: Option<f64>) -> StatsOutcome {
        let generation = self.begin_request();
        let result = self.guarded(|| self.build_selection(generation, fights, min, max));
        self.finish(result)
    }

    /// Recompute the last selection for a new window without re-reading the
    /// fights.
    pub fn rebuild(&self, min: Option<f64>, max: Option<f64>) -> StatsOutcome {
        let generation = self.begin_request();
        let result = self.guarded(|| self.rebuild_selection(generation, min, max));
        self.finish(result)
    }

    pub fn last_stats(&self) -> Option<Arc<CombinedStats>> {
        self.lock_state().last_stats.clone()
    }

    /// Blocks behind the last report, one vec per raid segment.
    pub fn chart_groups(&self) -> Arc<StatsGroups> {
        Arc::clone(&self.lock_state().last_groups)
    }

    /// Forget the selection and the last report.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.lock_state() = EngineState::default();
    }

    /// The state lock, recovered after a failed run. The state itself is
    /// reset by [`guarded`](Self::guarded) when that happens.
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|e| {
            self.state.clear_poison();
            e.into_inner()
        })
    }

    /// Run one request, turning a panic inside it into [`StatsError::Panicked`]
    /// and dropping whatever state the run left behind.
    fn guarded(&self, run: impl FnOnce() -> Result<RunOutcome, StatsError>) -> Result<RunOutcome, StatsError> {
        match panic::catch_unwind(AssertUnwindSafe(run)) {
            Ok(result) => result,
            Err(payload) => {
                *self.lock_state() = EngineState::default();
                Err(StatsError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            }
        }
    }

    fn begin_request(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(StatsGenerationEvent::new(self.dimension, GenerationState::Started));
        generation
    }

    fn superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    fn publish(&self, event: StatsGenerationEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    fn build_selection(
        &self,
        generation: u64,
        fights: &[SharedFight],
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<RunOutcome, StatsError> {
        let mut state = self.lock_state();
        if self.superseded(generation) {
            return Ok(RunOutcome::Superseded);
        }
        if fights.is_empty() {
            *state = EngineState::default();
            return Ok(RunOutcome::NoNpc);
        }

        let selection = Arc::new(self.collect(fights)?);
        state.selection = Some(Arc::clone(&selection));
        self.run(&mut state, &selection, generation, min, max)
    }

    fn rebuild_selection(&self, generation: u64, min: Option<f64>, max: Option<f64>) -> Result<RunOutcome, StatsError> {
        let mut state = self.lock_state();
        if self.superseded(generation) {
            return Ok(RunOutcome::Superseded);
        }
        let Some(selection) = state.selection.clone() else {
            return Ok(RunOutcome::NoNpc);
        };
        self.run(&mut state, &selection, generation, min, max)
    }

    fn run(
        &self,
        state: &mut EngineState,
        selection: &Selection,
        generation: u64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<RunOutcome, StatsError> {
        let computed = if selection.is_empty() {
            None
        } else {
            match self.compute(selection, generation, min, max) {
                Some(Some(computed)) => Some(computed),
                Some(None) => None,
                None => return Ok(RunOutcome::Superseded),
            }
        };

        match computed {
            Some((stats, groups)) => {
                let stats = Arc::new(stats);
                state.last_stats = Some(Arc::clone(&stats));
                state.last_groups = Arc::new(groups);
                Ok(RunOutcome::Completed(stats))
            }
            None => {
                state.last_stats = None;
                state.last_groups = Arc::default();
                Ok(RunOutcome::NoData)
            }
        }
    }

    fn finish(&self, result: Result<RunOutcome, StatsError>) -> StatsOutcome {
        match result {
            Ok(RunOutcome::Completed(stats)) => {
                info!(
                    dimension = ?self.dimension,
                    title = %stats.full_title,
                    rows = stats.stats_list.len(),
                    groups = stats.unique_group_count,
                    "Stats generated"
                );
                self.publish(StatsGenerationEvent::completed(Arc::clone(&stats)));
                StatsOutcome::Completed(stats)
            }
            Ok(RunOutcome::NoData) => {
                debug!(dimension = ?self.dimension, "No data for selection");
                self.publish(StatsGenerationEvent::new(self.dimension, GenerationState::NoData));
                StatsOutcome::NoData
            }
            Ok(RunOutcome::NoNpc) => {
                debug!(dimension = ?self.dimension, "No fights selected");
                self.publish(StatsGenerationEvent::new(self.dimension, GenerationState::NoNpc));
                StatsOutcome::NoNpc
            }
            Ok(RunOutcome::Superseded) => {
                debug!(dimension = ?self.dimension, "Stats request superseded");
                StatsOutcome::Superseded
            }
            Err(e) => {
                error!(dimension = ?self.dimension, error = %e, "Stats generation failed");
                self.publish(StatsGenerationEvent::failed(self.dimension, e.to_string()));
                StatsOutcome::Failed(e.to_string())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collection
    // ─────────────────────────────────────────────────────────────────────────

    fn collect(&self, fights: &[SharedFight]) -> Result<Selection, StatsError> {
        let mut copies = Vec::with_capacity(fights.len());
        for (position, fight) in fights.iter().enumerate() {
            let f = fight.read().map_err(|_| StatsError::FightLockPoisoned { position })?;
            copies.push(self.copy_fight(&f));
        }
        copies.sort_by_key(|c| c.id);

        let mut selection = Selection {
            target: copies.first().map(|c| resolve(c.name).to_string()).unwrap_or_default(),
            fight_count: copies.len(),
            ..Default::default()
        };

        let mut blocks = Vec::new();
        for copy in copies {
            if let Some(segment) = copy.segment {
                selection.raid.add(segment);
            }
            for (player, segment) in copy.segments {
                selection.ranges.entry(player).or_default().add(segment);
            }
            for (key, segment) in copy.sub_segments {
                selection.sub_ranges.entry(key).or_default().add(segment);
            }
            blocks.extend(copy.blocks);
        }

        selection.groups = match self.dimension {
            StatsDimension::Healing => {
                self.heal_groups(&selection.raid, &mut selection.ranges, &mut selection.sub_ranges)?
            }
            StatsDimension::Damage | StatsDimension::Tanking => {
                blocks.sort_by(|a, b| a.begin_time.total_cmp(&b.begin_time));
                split_groups(&selection.raid, blocks)
            }
        };

        if self.dimension == StatsDimension::Damage {
            selection.pet_owners = self.pet_owners(&selection.groups);
        }
        Ok(selection)
    }

    fn copy_fight(&self, f: &Fight) -> FightCopy {
        let mut copy = FightCopy {
            id: f.id,
            name: f.name,
            segment: None,
            blocks: Vec::new(),
            segments: Vec::new(),
            sub_segments: Vec::new(),
        };

        let (blocks, segments, sub_segments, begin, last) = match self.dimension {
            StatsDimension::Damage => (
                &f.damage_blocks,
                &f.damage_segments,
                &f.damage_sub_segments,
                f.begin_damage_time,
                f.last_damage_time,
            ),
            StatsDimension::Tanking => (
                &f.tanking_blocks,
                &f.tank_segments,
                &f.tank_sub_segments,
                f.begin_tanking_time,
                f.last_tanking_time,
            ),
            StatsDimension::Healing => {
                copy.segment = Some(TimeSegment::new(f.begin_time, f.last_time));
                return copy;
            }
        };

        if let (Some(begin), Some(last)) = (begin, last) {
            copy.segment = Some(TimeSegment::new(begin, last));
        }
        copy.blocks = blocks
            .iter()
            .map(|b| ActionGroup {
                begin_time: b.begin_time,
                actions: b.actions.iter().cloned().map(StatsAction::Damage).collect(),
            })
            .collect();
        copy.segments = segments.iter().map(|(p, s)| (*p, *s)).collect();
        copy.sub_segments = sub_segments
            .iter()
            .flat_map(|(p, subs)| subs.iter().map(move |(k, s)| ((*p, *k), *s)))
            .collect();
        copy
    }

    /// Heal blocks inside each raid segment. Healer time ranges run from a
    /// healer's first to last heal within each segment.
    fn heal_groups(
        &self,
        raid: &TimeRange,
        ranges: &mut HashMap<IStr, TimeRange>,
        sub_ranges: &mut HashMap<(IStr, IStr), TimeRange>,
    ) -> Result<StatsGroups, StatsError> {
        let mut groups = Vec::new();
        for segment in raid.segments() {
            let blocks = self.heal_log.during(segment.begin, segment.end)?;
            if blocks.is_empty() {
                continue;
            }

            let mut spans = HashMap::new();
            let mut sub_spans = HashMap::new();
            let mut group = Vec::with_capacity(blocks.len());
            for block in blocks {
                for record in &block.actions {
                    let key = create_record_key(record.hit_type, record.sub_type);
                    extend_span(&mut spans, record.healer, block.begin_time);
                    extend_span(&mut sub_spans, (record.healer, key), block.begin_time);
                }
                group.push(ActionGroup {
                    begin_time: block.begin_time,
                    actions: block.actions.into_iter().map(StatsAction::Heal).collect(),
                });
            }

            for (healer, span) in spans {
                ranges.entry(healer).or_default().add(span);
            }
            for (key, span) in sub_spans {
                sub_ranges.entry(key).or_default().add(span);
            }
            groups.push(group);
        }
        Ok(groups)
    }

    fn pet_owners(&self, groups: &StatsGroups) -> HashMap<IStr, IStr> {
        let unassigned = intern(UNASSIGNED);
        let mut owners = HashMap::new();
        let records = groups
            .iter()
            .flatten()
            .flat_map(|b| &b.actions)
            .filter_map(StatsAction::as_damage);

        for record in records {
            if owners.contains_key(&record.attacker) {
                continue;
            }
            let owner = self
                .registry
                .owner_of(record.attacker)
                .filter(|o| *o != unassigned)
                .or(record.attacker_owner);
            if let Some(owner) = owner
                && owner != record.attacker
            {
                owners.insert(record.attacker, owner);
            }
        }
        owners
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Computation
    // ─────────────────────────────────────────────────────────────────────────

    /// `None` when superseded, `Some(None)` when the window holds no blocks.
    fn compute(
        &self,
        selection: &Selection,
        generation: u64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Option<Option<(CombinedStats, StatsGroups)>> {
        let max_time = selection.raid.total();
        let (start, stop, raid_seconds) = if window_applies(min, max, max_time) {
            let (start, stop) = window_bounds(&selection.raid, min, max);
            let upper = max.map_or(max_time, |m| m.min(max_time));
            let lower = min.map_or(0.0, |m| m.max(0.0));
            (start, stop, (upper - lower).max(0.0))
        } else {
            (None, None, max_time)
        };

        let in_window = |time: f64| start.is_none_or(|s| time >= s) && stop.is_none_or(|e| time <= e);
        let groups: StatsGroups = selection
            .groups
            .iter()
            .map(|g| g.iter().filter(|b| in_window(b.begin_time)).cloned().collect::<Vec<_>>())
            .filter(|g| !g.is_empty())
            .collect();
        if groups.is_empty() {
            return Some(None);
        }
        if self.superseded(generation) {
            return None;
        }

        let mut aggregator = Aggregator::new(
            self.dimension,
            &self.registry,
            &selection.pet_owners,
            DamageValidator::new(self.validator.clone()),
        );
        for block in groups.iter().flatten() {
            for action in &block.actions {
                aggregator.add(action, block.begin_time);
            }
        }
        if self.superseded(generation) {
            return None;
        }

        let limited = self.dimension != StatsDimension::Healing && aggregator.validator.is_limited();
        let Aggregator {
            rows, children, raid, ..
        } = aggregator;

        let raid_total = raid.stats.summary.total;
        let mut raid_stats = raid.stats;
        raid_stats.summary.total_seconds = raid_seconds;
        for sub in &mut raid_stats.sub_stats {
            sub.total_seconds = raid_seconds;
        }
        raid_stats.calculate(raid_total, raid_seconds);
        raid_stats.sub_stats.sort_by(compare_sub_stats);

        let finish_row = |row: RowBuilder| -> PlayerStats {
            let mut stats = row.stats;
            let range = Selection::range_of(&selection.ranges, row.members.iter().copied());
            stats.summary.total_seconds = range.filter(start, stop).total();
            for (sub, key) in stats.sub_stats.iter_mut().zip(&row.sub_keys) {
                let keys = row.members.iter().map(|m| (*m, *key));
                sub.total_seconds = Selection::range_of(&selection.sub_ranges, keys).filter(start, stop).total();
            }
            stats.calculate(raid_total, raid_seconds);
            stats.summary.percent = stats.summary.percent_of_raid;
            stats.sub_stats.sort_by(compare_sub_stats);
            stats
        };

        let units = split_units(rows, &children);
        let mut units: Vec<(PlayerStats, Vec<PlayerStats>)> = units
            .into_par_iter()
            .map(|(top, kids)| {
                let top = finish_row(top);
                let mut kids: Vec<PlayerStats> = kids
                    .into_iter()
                    .map(|kid| {
                        let mut kid = finish_row(kid);
                        kid.summary.percent = percent(kid.total() as f64, top.total() as f64);
                        kid
                    })
                    .collect();
                kids.sort_by(compare_stats);
                (top, kids)
            })
            .collect();
        units.sort_by(|a, b| compare_stats(&a.0, &b.0));

        if self.superseded(generation) {
            return None;
        }

        let mut stats_list = Vec::with_capacity(units.len());
        let mut expanded_stats_list = Vec::new();
        let mut children_map = BTreeMap::new();
        let mut unique_classes = BTreeSet::new();
        for (rank, (mut top, kids)) in units.into_iter().enumerate() {
            top.summary.rank = (rank + 1) as u16;
            for row in std::iter::once(&top).chain(&kids) {
                if !row.class_name.is_empty() {
                    unique_classes.insert(row.class_name.clone());
                }
            }
            expanded_stats_list.push(top.clone());
            expanded_stats_list.extend(kids.iter().cloned());
            if !kids.is_empty() {
                children_map.insert(top.name().to_string(), kids);
            }
            stats_list.push(top);
        }

        let target = target_title(&selection.target, selection.fight_count);
        let time = time_title(raid_seconds);
        let totals = total_title(raid_total, self.dimension.label(), raid_stats.summary.dps);
        let unique_group_count = groups.len();

        Some(Some((
            CombinedStats {
                dimension: self.dimension,
                full_title: format_title(&target, &time, &totals),
                short_title: format_title(&target, &time, ""),
                target_title: target,
                time_title: time,
                total_title: totals,
                raid_stats,
                stats_list,
                expanded_stats_list,
                children: children_map,
                unique_classes,
                limited,
                unique_group_count,
            },
            groups,
        )))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn class_of(registry: &PlayerRegistry, player: IStr) -> String {
    registry
        .player_class(player)
        .map(|c| resolve(c).to_string())
        .unwrap_or_default()
}

fn extend_span<K: Eq + Hash>(spans: &mut HashMap<K, TimeSegment>, key: K, time: f64) {
    spans
        .entry(key)
        .and_modify(|s| s.end = time)
        .or_insert(TimeSegment::new(time, time));
}

/// Place sorted blocks into the raid segment containing them, merging blocks
/// that share a time.
fn split_groups(raid: &TimeRange, blocks: Vec<ActionGroup<StatsAction>>) -> StatsGroups {
    let segments = raid.segments();
    let mut groups: StatsGroups = (0..segments.len()).map(|_| Vec::new()).collect();
    let mut at = 0;

    for block in blocks {
        while at < segments.len() && segments[at].end < block.begin_time {
            at += 1;
        }
        let Some(segment) = segments.get(at) else {
            break;
        };
        if !segment.contains(block.begin_time) {
            continue;
        }

        let group = &mut groups[at];
        match group.last_mut() {
            Some(last) if last.begin_time == block.begin_time => last.actions.extend(block.actions),
            _ => group.push(block),
        }
    }

    groups.retain(|g| !g.is_empty());
    groups
}

/// Pair every top-level row with the rows it aggregates.
fn split_units(
    mut rows: HashMap<String, RowBuilder>,
    children: &HashMap<String, Vec<String>>,
) -> Vec<(RowBuilder, Vec<RowBuilder>)> {
    let mut kids_of: HashMap<String, Vec<RowBuilder>> = HashMap::new();
    for (parent, names) in children {
        let kids = names.iter().filter_map(|n| rows.remove(n)).collect();
        kids_of.insert(parent.clone(), kids);
    }

    rows.into_iter()
        .map(|(name, row)| (row, kids_of.remove(&name).unwrap_or_default()))
        .collect()
}

fn compare_stats(a: &PlayerStats, b: &PlayerStats) -> CmpOrdering {
    b.total().cmp(&a.total()).then_with(|| a.name().cmp(b.name()))
}

fn compare_sub_stats(a: &PlayerSubStats, b: &PlayerSubStats) -> CmpOrdering {
    b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key))
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregation
// ─────────────────────────────────────────────────────────────────────────────

/// One row being accumulated, with its per-key sub rows.
struct RowBuilder {
    stats: PlayerStats,
    /// Actors whose time ranges make up this row's active time
    members: Vec<IStr>,
    /// Record key of each entry in `stats.sub_stats`
    sub_keys: Vec<IStr>,
    sub_index: HashMap<IStr, usize>,
    last_time: Option<f64>,
    sub_last: Vec<Option<f64>>,
}

impl RowBuilder {
    fn new(name: &str, orig_name: &str, class_name: &str, is_top_level: bool) -> Self {
        let mut stats = PlayerStats::new(name, orig_name, class_name);
        stats.is_top_level = is_top_level;
        Self {
            stats,
            members: Vec::new(),
            sub_keys: Vec::new(),
            sub_index: HashMap::new(),
            last_time: None,
            sub_last: Vec::new(),
        }
    }

    fn add_member(&mut self, actor: IStr) {
        if !self.members.contains(&actor) {
            self.members.push(actor);
        }
    }

    fn update(&mut self, action: &StatsAction, key: IStr, time: f64, is_pet: bool) {
        let new_frame = self.last_time.is_some_and(|t| t != time);
        self.last_time = Some(time);
        self.stats.summary.update(action, new_frame, is_pet);

        let index = match self.sub_index.get(&key) {
            Some(index) => *index,
            None => {
                let index = self.stats.sub_stats.len();
                self.stats.sub_stats.push(PlayerSubStats::for_key(
                    resolve(action.sub_type()),
                    resolve(key),
                    action.hit_type(),
                ));
                self.sub_keys.push(key);
                self.sub_last.push(None);
                self.sub_index.insert(key, index);
                index
            }
        };

        let sub_new_frame = self.sub_last[index].is_some_and(|t| t != time);
        self.sub_last[index] = Some(time);
        let sub = &mut self.stats.sub_stats[index];
        sub.update(action, sub_new_frame, is_pet);

        let total = action.total();
        if total > 0 && action.hit_type().is_hit() {
            sub.add_frequency(total, action.modifiers().contains(Modifiers::CRIT));
        }
    }
}

/// Where a record lands: its own row, and the "+Pets" aggregate when the
/// actor is a pet or owns pets.
struct Placement {
    actor: IStr,
    owner: Option<IStr>,
    parent: Option<IStr>,
}

struct Aggregator<'a> {
    dimension: StatsDimension,
    registry: &'a PlayerRegistry,
    pet_owners: &'a HashMap<IStr, IStr>,
    owners: HashSet<IStr>,
    validator: DamageValidator,
    rows: HashMap<String, RowBuilder>,
    children: HashMap<String, Vec<String>>,
    raid: RowBuilder,
}

impl<'a> Aggregator<'a> {
    fn new(
        dimension: StatsDimension,
        registry: &'a PlayerRegistry,
        pet_owners: &'a HashMap<IStr, IStr>,
        validator: DamageValidator,
    ) -> Self {
        Self {
            dimension,
            registry,
            pet_owners,
            owners: pet_owners.values().copied().collect(),
            validator,
            rows: HashMap::new(),
            children: HashMap::new(),
            raid: RowBuilder::new(RAID_TOTALS, RAID_TOTALS, "", true),
        }
    }

    fn add(&mut self, action: &StatsAction, time: f64) {
        let verdict = match action {
            StatsAction::Damage(record) => self.validator.accept(record),
            StatsAction::Heal(_) => Verdict::Valid,
        };
        if verdict == Verdict::Rejected {
            return;
        }

        let placement = self.place(action.actor(self.dimension));
        if verdict == Verdict::BaneExcluded {
            self.player_row(&placement).stats.summary.bane_hits += 1;
            if let Some(parent) = placement.parent {
                self.aggregate_row(parent, placement.actor).stats.summary.bane_hits += 1;
            }
            self.raid.stats.summary.bane_hits += 1;
            return;
        }

        let key = create_record_key(action.hit_type(), action.sub_type());
        let is_pet = placement.owner.is_some();
        self.player_row(&placement).update(action, key, time, is_pet);
        if let Some(parent) = placement.parent {
            self.aggregate_row(parent, placement.actor).update(action, key, time, is_pet);
        }
        self.raid.update(action, key, time, false);
    }

    fn place(&self, actor: IStr) -> Placement {
        let owner = self.pet_owners.get(&actor).copied();
        let parent = owner.or_else(|| self.owners.contains(&actor).then_some(actor));
        Placement { actor, owner, parent }
    }

    fn player_row(&mut self, placement: &Placement) -> &mut RowBuilder {
        let registry = self.registry;
        let actor = placement.actor;
        let owner = placement.owner;
        let is_top_level = placement.parent.is_none();
        self.rows.entry_ref(resolve(actor)).or_insert_with(|| {
            let class_name = if owner.is_some() { String::new() } else { class_of(registry, actor) };
            let mut row = RowBuilder::new(resolve(actor), resolve(owner.unwrap_or(actor)), &class_name, is_top_level);
            row.add_member(actor);
            row
        })
    }

    fn aggregate_row(&mut self, owner: IStr, member: IStr) -> &mut RowBuilder {
        let name = aggregate_name(owner);
        let kids = self.children.entry_ref(name.as_str()).or_default();
        let member_name = resolve(member);
        if !kids.iter().any(|k| k == member_name) {
            kids.push(member_name.to_string());
        }

        let registry = self.registry;
        let row = self
            .rows
            .entry(name)
            .or_insert_with_key(|name| RowBuilder::new(name, resolve(owner), &class_of(registry, owner), true));
        row.add_member(member);
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_request_is_superseded_and_silent() {
        let engine = StatsAggregationEngine::new(
            StatsDimension::Damage,
            Arc::new(PlayerRegistry::new()),
            Arc::new(HealLog::new()),
            ValidatorSettings::default(),
            8,
        );
        let mut events = engine.subscribe();

        let stale = engine.begin_request();
        assert!(!engine.superseded(stale));
        let newer = engine.begin_request();
        assert!(engine.superseded(stale));

        let outcome = engine.finish(engine.rebuild_selection(stale, None, None));
        assert!(matches!(outcome, StatsOutcome::Superseded));

        let outcome = engine.finish(engine.rebuild_selection(newer, None, None));
        assert!(matches!(outcome, StatsOutcome::NoNpc));

        let states: Vec<GenerationState> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.state)
            .collect();
        assert_eq!(
            states,
            vec![GenerationState::Started, GenerationState::Started, GenerationState::NoNpc]
        );
    }

    #[test]
    fn panicking_run_fails_and_engine_recovers() {
        let engine = StatsAggregationEngine::new(
            StatsDimension::Damage,
            Arc::new(PlayerRegistry::new()),
            Arc::new(HealLog::new()),
            ValidatorSettings::default(),
            8,
        );
        let mut events = engine.subscribe();

        let result = engine.guarded(|| -> Result<RunOutcome, StatsError> {
            let _state = engine.lock_state();
            panic!("row overflow")
        });
        match engine.finish(result) {
            StatsOutcome::Failed(message) => assert!(message.contains("row overflow"), "{message}"),
            other => panic!("expected failure, got {other:?}"),
        }
        let failed = events.try_recv().unwrap();
        assert_eq!(failed.state, GenerationState::Failed);
        assert!(failed.error.is_some_and(|e| e.contains("row overflow")));

        // The state lock is usable again
        assert!(engine.last_stats().is_none());
        assert!(matches!(engine.build(&[], None, None), StatsOutcome::NoNpc));
    }
}
