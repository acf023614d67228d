//! Configuration loader for habitlog.
//!
//! Reads `config.toml` from the data directory (`~/.habitlog/` by default)
//! into [`HabitlogConfig`], then applies environment overrides for the
//! session timing values.

use std::path::{Path, PathBuf};

use habitlog_types::config::HabitlogConfig;

/// Overrides `session_ttl_minutes`.
pub const ENV_SESSION_TTL: &str = "SESSION_TTL_MINUTES";
/// Overrides `session_cleanup_minutes`.
pub const ENV_SESSION_CLEANUP: &str = "SESSION_CLEANUP_MINUTES";
/// Overrides the data directory.
pub const ENV_DATA_DIR: &str = "HABITLOG_DATA_DIR";

/// Load configuration from `{data_dir}/config.toml` plus environment overrides.
///
/// - Missing file: defaults.
/// - Unreadable or malformed file: logs a warning and uses defaults.
pub async fn load_config(data_dir: &Path) -> HabitlogConfig {
    let config = read_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

async fn read_config_file(data_dir: &Path) -> HabitlogConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return HabitlogConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return HabitlogConfig::default();
        }
    };

    match toml::from_str::<HabitlogConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            HabitlogConfig::default()
        }
    }
}

/// Apply `SESSION_TTL_MINUTES` / `SESSION_CLEANUP_MINUTES` from `lookup`.
///
/// Values that are not non-negative integers are ignored with a warning.
pub fn apply_env_overrides(
    mut config: HabitlogConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> HabitlogConfig {
    if let Some(minutes) = minutes_override(&lookup, ENV_SESSION_TTL) {
        config.session_ttl_minutes = minutes;
    }
    if let Some(minutes) = minutes_override(&lookup, ENV_SESSION_CLEANUP) {
        config.session_cleanup_minutes = minutes;
    }
    config
}

fn minutes_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(minutes) => Some(minutes),
        Err(err) => {
            tracing::warn!("Ignoring {key}={raw:?}: {err}");
            None
        }
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `HABITLOG_DATA_DIR` environment variable
/// 2. `~/.habitlog`
/// 3. `./.habitlog` when no home directory is known
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".habitlog");
    }

    PathBuf::from(".habitlog")
}
