use clap::{Parser, Subcommand};
use fightlog_cli::CliContext;
use fightlog_cli::commands::{self, StatsRequest};
use fightlog_cli::logging;
use fightlog_cli::readline;
use fightlog_core::context::{FightSelector, StatsDimension};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), String> {
    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = logging::init();

    let ctx = CliContext::new();
    ctx.start_signal_printer().await;

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(line, &ctx).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(std::io::stdout(), "{err}").map_err(|e| e.to_string())?;
                std::io::stdout().flush().map_err(|e| e.to_string())?;
            }
        }
    }

    ctx.shutdown().await;
    Ok(())
}

#[derive(Parser)]
#[command(version, about = "fightlog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a record file into the session
    Load { path: String },
    /// List fights of the session
    Fights {
        #[arg(short, long)]
        overlay: bool,
    },
    /// Build a report over the selected fights
    Stats {
        /// damage, tanking or healing
        #[arg(short, long, default_value = "damage")]
        dimension: String,
        /// Fights whose creature name matches
        #[arg(short, long)]
        target: Option<String>,
        /// Comma separated fight ids
        #[arg(short, long)]
        ids: Option<String>,
        #[arg(short, long)]
        group: Option<i32>,
        #[arg(long)]
        overlay: bool,
        /// Window start, seconds from the first record
        #[arg(long)]
        min: Option<f64>,
        /// Window end, seconds from the first record
        #[arg(long)]
        max: Option<f64>,
        /// Reuse the previous selection
        #[arg(short, long)]
        rebuild: bool,
        /// Show per ability rows
        #[arg(long)]
        details: bool,
    },
    Players,
    AddPlayer { name: String },
    RemovePlayer { name: String },
    AddPet {
        name: String,
        #[arg(short, long)]
        owner: Option<String>,
    },
    RemovePet { name: String },
    AddMerc { name: String },
    AddNpc { name: String },
    SetClass { player: String, class_name: String },
    /// Finish fights idle at the given record time
    Expire { time: f64 },
    /// Drop finished fights from the overlay list
    Prune { time: f64 },
    Reset,
    Config,
    Set { key: String, value: String },
    Exit,
}

async fn respond(line: &str, ctx: &CliContext) -> Result<bool, String> {
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "fightlog".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(Commands::Load { path }) => commands::load_file(&path, ctx).await?,
        Some(Commands::Fights { overlay }) => commands::list_fights(ctx, overlay),
        Some(Commands::Stats {
            dimension,
            target,
            ids,
            group,
            overlay,
            min,
            max,
            rebuild,
            details,
        }) => {
            let dimension = StatsDimension::from_name(&dimension)
                .ok_or_else(|| format!("unknown dimension '{dimension}'\n"))?;
            let selector = if let Some(ids) = ids {
                FightSelector::Ids(commands::parse_ids(&ids)?)
            } else if let Some(target) = target {
                FightSelector::Name(target)
            } else if let Some(group) = group {
                FightSelector::Group(group)
            } else if overlay {
                FightSelector::Overlay
            } else {
                FightSelector::All
            };
            let request = StatsRequest {
                dimension,
                selector,
                min,
                max,
                rebuild,
                details,
            };
            commands::show_stats(request, ctx).await?
        }
        Some(Commands::Players) => commands::list_players(ctx),
        Some(Commands::AddPlayer { name }) => commands::add_player(&name, ctx)?,
        Some(Commands::RemovePlayer { name }) => commands::remove_player(&name, ctx),
        Some(Commands::AddPet { name, owner }) => commands::add_pet(&name, owner.as_deref(), ctx),
        Some(Commands::RemovePet { name }) => commands::remove_pet(&name, ctx),
        Some(Commands::AddMerc { name }) => commands::add_merc(&name, ctx),
        Some(Commands::AddNpc { name }) => commands::add_npc(&name, ctx),
        Some(Commands::SetClass { player, class_name }) => commands::set_class(&player, &class_name, ctx),
        Some(Commands::Expire { time }) => commands::expire(time, ctx),
        Some(Commands::Prune { time }) => commands::prune_overlay(time, ctx),
        Some(Commands::Reset) => commands::reset(ctx).await,
        Some(Commands::Config) => commands::show_settings(ctx).await,
        Some(Commands::Set { key, value }) => commands::set_setting(&key, &value, ctx).await?,
        Some(Commands::Exit) => {
            commands::exit();
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}
