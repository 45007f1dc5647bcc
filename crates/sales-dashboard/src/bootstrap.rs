use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Root of the dashboard's per-user state, `~/.sales-dashboard/`.
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sales-dashboard")
}

/// Ensure `~/.sales-dashboard/` and `~/.sales-dashboard/logs/` exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = state_dir();
    std::fs::create_dir_all(&dir)?;
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log-level name to an [`EnvFilter`] directive.
///
/// Unknown names pass through unchanged so `RUST_LOG`-style directives work.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr, or to `log_file` (appending, no ANSI colours) when
/// one is given.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .init();
        }
    }

    Ok(())
}
