use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SalesError};

/// Selector value meaning "no restriction".
pub const ALL: &str = "All";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Explore a spreadsheet of sales records and ask simple questions about it
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sales-dashboard",
    about = "Explore a spreadsheet of sales records and ask simple questions about it",
    version
)]
pub struct Settings {
    /// Spreadsheet with Date, Product, Sales and Quantity columns (.csv or .tsv)
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// View mode
    #[arg(long, default_value = "summary", value_parser = ["summary", "table", "ask"])]
    pub view: String,

    /// Year selector ("All" or a calendar year)
    #[arg(long, default_value = ALL)]
    pub year: String,

    /// Product selector ("All" or a product label)
    #[arg(long, default_value = ALL)]
    pub product: String,

    /// Question to answer; may be repeated. Read from stdin in the ask view when absent
    #[arg(long, short)]
    pub question: Vec<String>,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Maximum number of rows printed by the table view
    #[arg(long, default_value = "50")]
    pub limit: usize,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.sales-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl LastUsedParams {
    /// Default location: `~/.sales-dashboard/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".sales-dashboard").join("last_used.json")
    }

    /// Load persisted params; `Default` when the file is absent or unreadable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill unset values from the last run and persist
    /// the merged result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit args and config
    /// path.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Failed to clear {}: {}", config_path.display(), e);
            }
            return Self::resolve(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        settings.file = settings.file.take().or(last.file);
        // clap keys args by field name, not by the long-flag spelling.
        inherit(&matches, "view", &mut settings.view, last.view);
        inherit(&matches, "year", &mut settings.year, last.year);
        inherit(&matches, "product", &mut settings.product, last.product);

        settings = Self::resolve(settings);

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::warn!("Failed to persist settings: {}", e);
        }

        settings
    }

    /// Apply the `--debug` override.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The spreadsheet to load; a config error when neither the command line
    /// nor the last run named one.
    pub fn data_file(&self) -> Result<&Path> {
        self.file.as_deref().ok_or_else(|| {
            SalesError::Config("no spreadsheet given; pass --file <PATH>".to_string())
        })
    }

    /// Year selector as a filter value (`None` = All).
    pub fn year_selection(&self) -> Result<Option<i32>> {
        parse_year_selector(&self.year)
    }

    /// Product selector as a filter value (`None` = All).
    pub fn product_selection(&self) -> Option<String> {
        parse_selector(&self.product).map(str::to_string)
    }
}

// ── Selector parsing ───────────────────────────────────────────────────────────

/// `"All"` (any case) or blank → `None`; anything else is kept trimmed.
pub fn parse_selector(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL) {
        None
    } else {
        Some(trimmed)
    }
}

/// Parse a year selector; non-numeric values other than `"All"` are rejected.
pub fn parse_year_selector(raw: &str) -> Result<Option<i32>> {
    match parse_selector(raw) {
        None => Ok(None),
        Some(s) => s
            .parse::<i32>()
            .map(Some)
            .map_err(|_| SalesError::Config(format!("invalid year selector: {s}"))),
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            file: s.file.clone(),
            view: Some(s.view.clone()),
            year: Some(s.year.clone()),
            product: Some(s.product.clone()),
        }
    }
}

/// Take the remembered value for `name` unless it was typed on this run.
fn inherit(matches: &clap::ArgMatches, name: &str, slot: &mut String, remembered: Option<String>) {
    let from_cli = matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine);
    if let (false, Some(value)) = (from_cli, remembered) {
        *slot = value;
    }
}
