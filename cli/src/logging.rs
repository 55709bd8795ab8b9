//! Logging configuration with file-based output and size-based rotation.
//!
//! Writes logs to `~/.config/fightlog/fightlog.log` (or platform equivalent)
//! with 10 MB size-based rotation. Set `DEBUG_LOGGING=1` to enable debug
//! output for fightlog crates.

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEBUG_DIRECTIVE: &str = "warn,fightlog_core=debug,fightlog_cli=debug";
const DEFAULT_DIRECTIVE: &str = "warn";
const FILE_DIRECTIVE: &str = "info";
const FILE_DEBUG_DIRECTIVE: &str = "info,fightlog_core=debug,fightlog_cli=debug";

/// Initialize logging: warnings on stdout so the REPL stays readable, INFO+
/// to the log file.
///
/// Returns a `WorkerGuard` that must be held for the program lifetime so
/// buffered lines are flushed on exit. `None` means stdout-only logging.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let Some(log_dir) = dirs::config_dir().map(|config| config.join("fightlog")) else {
        init_stdout_only(debug_logging);
        return None;
    };

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // No subscriber yet
        eprintln!("Failed to create log directory {log_dir:?}: {e}, using stdout only");
        init_stdout_only(debug_logging);
        return None;
    }

    let log_path = log_dir.join("fightlog.log");
    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(10 * 1024 * 1024),
        1,
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {log_path:?}: {e}");
            init_stdout_only(debug_logging);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = if debug_logging { FILE_DEBUG_DIRECTIVE } else { FILE_DIRECTIVE };
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(EnvFilter::new(file_filter));

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(stdout_filter(debug_logging));

    tracing_subscriber::registry().with(file_layer).with(stdout_layer).init();

    tracing::info!(log_file = ?log_path, debug_logging, "fightlog logging initialized");

    Some(guard)
}

fn stdout_filter(debug_logging: bool) -> EnvFilter {
    EnvFilter::new(if debug_logging { DEBUG_DIRECTIVE } else { DEFAULT_DIRECTIVE })
}

/// Fallback when the log file cannot be opened.
fn init_stdout_only(debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(stdout_filter(debug_logging));

    tracing_subscriber::registry().with(stdout_layer).init();

    tracing::info!(debug_logging, "fightlog logging initialized (stdout only)");
}
