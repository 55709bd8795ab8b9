use std::io::Write;
use std::path::Path;

use fightlog_core::context::{AppConfigExt, FightSelector, StatsDimension, intern, resolve};
use fightlog_core::players::is_possible_player_name;
use fightlog_core::stats::calc::format_totals;
use fightlog_core::stats::{CombinedStats, PlayerStats, StatsOutcome};

use crate::CliContext;

pub async fn load_file(path: &str, ctx: &CliContext) -> Result<(), String> {
    let summary = ctx
        .app
        .load_file(Path::new(path))
        .await
        .map_err(|e| format!("{e}\n"))?;

    println!(
        "replayed {} records from {} in {}ms ({} unreadable lines, {} dropped)",
        summary.events,
        summary.path.display(),
        summary.elapsed_ms,
        summary.parse_errors,
        summary.dropped
    );
    Ok(())
}

pub fn list_fights(ctx: &CliContext, overlay: bool) {
    let selector = if overlay { FightSelector::Overlay } else { FightSelector::All };
    let fights = ctx.app.select_fights(&selector);
    if fights.is_empty() {
        println!("No fights");
        return;
    }

    println!(
        "{:>4} {:<28} {:>5} {:<16} {:>10} {:>7} {:>10}  State",
        "Id", "Name", "Group", "Start", "Damage", "Hits", "Tanked"
    );
    println!("{}", "-".repeat(98));
    for fight in fights {
        let Ok(f) = fight.read() else {
            continue;
        };
        println!(
            "{:>4} {:<28} {:>5} {:<16} {:>10} {:>7} {:>10}  {}",
            f.id,
            resolve(f.name),
            f.group_id,
            f.begin_time_string,
            format_totals(f.damage_total),
            f.damage_hits,
            format_totals(f.tank_total),
            if f.dead { "done" } else { "active" }
        );
    }
}

/// Arguments of the `stats` command after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRequest {
    pub dimension: StatsDimension,
    pub selector: FightSelector,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Reuse the last selection with a new window
    pub rebuild: bool,
    pub details: bool,
}

pub async fn show_stats(request: StatsRequest, ctx: &CliContext) -> Result<(), String> {
    let outcome = if request.rebuild {
        ctx.app.rebuild_stats(request.dimension, request.min, request.max).await
    } else {
        ctx.app
            .stats(request.dimension, &request.selector, request.min, request.max)
            .await
    }
    .map_err(|e| format!("{e}\n"))?;

    match outcome {
        StatsOutcome::Completed(stats) => print_stats(&stats, request.details),
        StatsOutcome::NoData => println!("No {} data for the selected fights", request.dimension.label()),
        StatsOutcome::NoNpc => println!("No fights selected"),
        StatsOutcome::Superseded => println!("Request superseded by a newer one"),
        StatsOutcome::Failed(e) => return Err(format!("stats failed: {e}\n")),
    }
    Ok(())
}

fn print_stats(stats: &CombinedStats, details: bool) {
    let rate_label = stats.dimension.rate_label();
    println!("{}", stats.full_title);
    if stats.limited {
        println!("(some damage kinds are excluded by the validator settings)");
    }
    let scaled_label = format!("S{rate_label}");
    println!(
        "{:>3}  {:<28} {:>9} {:>8} {:>8} {:>6} {:>7} {:>7}",
        "#", "Name", "Total", rate_label, scaled_label, "Secs", "%Raid", "Crit%"
    );
    println!("{}", "-".repeat(84));

    for row in &stats.stats_list {
        print_row(row, row.summary.rank.to_string(), 0);
        if let Some(children) = stats.children.get(row.name()) {
            for child in children {
                print_row(child, String::new(), 2);
            }
        }
        if details {
            for sub in &row.sub_stats {
                println!(
                    "{:>3}      {:<24} {:>9} {:>8} {:>8} {:>6} {:>7} {:>7}",
                    "",
                    sub.name,
                    format_totals(sub.total),
                    format_totals(sub.dps),
                    format_totals(sub.sdps),
                    sub.total_seconds,
                    sub.percent,
                    sub.crit_rate
                );
            }
        }
    }

    let raid = &stats.raid_stats.summary;
    println!("{}", "-".repeat(84));
    println!(
        "{:>3}  {:<28} {:>9} {:>8} {:>8} {:>6}",
        "",
        stats.raid_stats.name(),
        format_totals(raid.total),
        format_totals(raid.dps),
        "",
        raid.total_seconds
    );
    if !stats.unique_classes.is_empty() {
        let classes: Vec<&str> = stats.unique_classes.iter().map(String::as_str).collect();
        println!("classes: {}", classes.join(", "));
    }
}

fn print_row(row: &PlayerStats, rank: String, indent: usize) {
    let s = &row.summary;
    let name = format!("{}{}", " ".repeat(indent), row.name());
    println!(
        "{:>3}  {:<28} {:>9} {:>8} {:>8} {:>6} {:>7} {:>7}",
        rank,
        name,
        format_totals(s.total),
        format_totals(s.dps),
        format_totals(s.sdps),
        s.total_seconds,
        s.percent_of_raid,
        s.crit_rate
    );
}

/// "1,2,5" → `[1, 2, 5]`
pub fn parse_ids(text: &str) -> Result<Vec<i64>, String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().map_err(|_| format!("invalid fight id '{s}'\n")))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

pub fn add_player(name: &str, ctx: &CliContext) -> Result<(), String> {
    if !is_possible_player_name(name) {
        return Err(format!("'{name}' is not a valid player name\n"));
    }
    ctx.app.registry().add_verified_player(intern(name), 0.0);
    println!("added player {name}");
    Ok(())
}

pub fn remove_player(name: &str, ctx: &CliContext) {
    ctx.app.registry().remove_verified_player(intern(name));
    println!("removed player {name}");
}

pub fn add_pet(name: &str, owner: Option<&str>, ctx: &CliContext) {
    let registry = ctx.app.registry();
    registry.add_verified_pet(intern(name));
    if let Some(owner) = owner {
        registry.add_pet_to_player(intern(name), intern(owner));
    }
    match registry.owner_of(intern(name)) {
        Some(owner) => println!("added pet {name} (owner {})", resolve(owner)),
        None => println!("added pet {name}"),
    }
}

pub fn remove_pet(name: &str, ctx: &CliContext) {
    ctx.app.registry().remove_verified_pet(intern(name));
    println!("removed pet {name}");
}

pub fn add_merc(name: &str, ctx: &CliContext) {
    ctx.app.registry().add_merc(name);
    println!("added mercenary {name}");
}

pub fn add_npc(name: &str, ctx: &CliContext) {
    ctx.app.registry().add_known_npc(intern(name));
    println!("added creature {name}");
}

pub fn set_class(player: &str, class_name: &str, ctx: &CliContext) {
    ctx.app.registry().set_player_class(intern(player), intern(class_name));
    println!("{player} is a {class_name}");
}

pub fn list_players(ctx: &CliContext) {
    let registry = ctx.app.registry();
    let players = registry.verified_players();
    if players.is_empty() {
        println!("No players");
    }
    for player in players {
        let class_name = registry.player_class(player).map(resolve).unwrap_or("-");
        println!("{:<28} {}", resolve(player), class_name);
    }
    for (pet, owner) in registry.pet_mappings() {
        println!("{:<28} pet of {}", resolve(pet), resolve(owner));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub fn expire(time: f64, ctx: &CliContext) {
    let expired = ctx.app.lifecycle().check_expire(time);
    println!("{} fights expired", expired.len());
}

pub fn prune_overlay(time: f64, ctx: &CliContext) {
    let pruned = ctx.app.lifecycle().prune_overlay(time);
    println!("{pruned} fights removed from the overlay list");
}

pub async fn reset(ctx: &CliContext) {
    ctx.app.reset().await;
    println!("session reset");
}

pub async fn show_settings(ctx: &CliContext) {
    let config = ctx.config.read().await;
    if let Ok(path) = fightlog_core::context::AppConfig::config_path() {
        println!("config file: {}", path.display());
    }
    for (key, value) in config.options() {
        println!("{key:<30} {value}");
    }
}

pub async fn set_setting(key: &str, value: &str, ctx: &CliContext) -> Result<(), String> {
    let mut config = ctx.config.write().await;
    config.set_option(key, value).map_err(|e| format!("{e}\n"))?;
    config.save().map_err(|e| format!("{e}\n"))?;
    println!("{key} = {value} (applies after restart)");
    Ok(())
}

pub fn exit() {
    // Nothing useful to do if stdout is gone
    let _ = write!(std::io::stdout(), "quitting...");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_from_comma_list() {
        assert_eq!(parse_ids("1, 2,5").unwrap(), vec![1, 2, 5]);
        assert_eq!(parse_ids("").unwrap(), Vec::<i64>::new());
        assert!(parse_ids("1,x").is_err());
    }
}
