//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use console::{StyledObject, style};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use qbridge_adapter_ibm::{IbmProvider, Instance, JobStatus};

/// How results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

/// User preferences read from `~/.qbridge/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Default number of jobs listed.
    pub default_limit: Option<usize>,
    /// Default instance as `hub/group/project`.
    pub instance: Option<String>,
    /// Default output format.
    pub format: Option<OutputFormat>,
}

/// Return the default qbridge state directory (~/.qbridge/).
pub fn default_state_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".qbridge"))
}

/// Parse preferences from YAML text.
pub fn parse_preferences(text: &str) -> Result<Preferences> {
    if text.trim().is_empty() {
        return Ok(Preferences::default());
    }
    serde_yaml_ng::from_str(text).context("Invalid preferences file")
}

/// Load preferences from a file; a missing file means defaults.
pub fn load_preferences_from(path: &Path) -> Result<Preferences> {
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read preferences: {}", path.display()))?;
    parse_preferences(&text).with_context(|| format!("In {}", path.display()))
}

/// Load preferences from the default location.
pub fn load_preferences() -> Result<Preferences> {
    load_preferences_from(&default_state_dir()?.join("config.yaml"))
}

/// Parse a date given on the command line.
///
/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(text: &str) -> Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").with_context(|| {
        format!("Invalid date '{text}'. Use RFC 3339 (2021-03-01T12:00:00Z) or YYYY-MM-DD")
    })?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date '{text}'"))?;
    Ok(midnight.and_utc())
}

/// Spinner shown while waiting on the server.
pub fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Log in and select an instance.
///
/// The instance comes from `--instance`, then the preferences file, then the
/// saved account.
pub async fn connect(token: Option<&str>, instance: Option<&str>) -> Result<IbmProvider> {
    let preferences = load_preferences()?;
    let instance = match instance.or(preferences.instance.as_deref()) {
        Some(text) => Some(text.parse::<Instance>()?),
        None => None,
    };

    let spinner = spinner("Connecting to IBM Quantum...")?;
    let provider = IbmProvider::from_saved_or_env(token, instance).await;
    spinner.finish_and_clear();

    let provider = provider?;
    if let Some(instance) = provider.instance() {
        tracing::info!("connected to {instance}");
    }
    Ok(provider)
}

/// Status name colored by state.
pub fn styled_status(status: JobStatus) -> StyledObject<&'static str> {
    let name = status.name();
    match status {
        JobStatus::Done => style(name).green(),
        JobStatus::Error => style(name).red(),
        JobStatus::Cancelled => style(name).dim(),
        JobStatus::Running => style(name).cyan(),
        _ => style(name).yellow(),
    }
}
