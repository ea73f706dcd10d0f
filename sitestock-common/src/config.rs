//! Configuration loading and root folder resolution
//!
//! The root folder holds the SQLite database and the optional `config.toml`.
//! Gateway credentials resolve environment-first so deployments can keep
//! secrets out of the config file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Database file name inside the root folder
pub const DB_FILE_NAME: &str = "sitestock.db";

/// Config file name inside the root folder
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the root folder, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `SITESTOCK_ROOT` environment variable
/// 3. OS-dependent default data directory (fallback)
pub fn resolve_root_folder(cli_arg: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path;
    }

    if let Ok(path) = std::env::var("SITESTOCK_ROOT") {
        return PathBuf::from(path);
    }

    dirs::data_local_dir()
        .map(|d| d.join("sitestock"))
        .unwrap_or_else(|| PathBuf::from("./sitestock_data"))
}

/// Create the root folder if it does not exist yet
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

/// Path of the SQLite database inside the root folder
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DB_FILE_NAME)
}

/// Raw `config.toml` contents (all fields optional)
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    at_username: Option<String>,
    at_api_key: Option<String>,
    at_sender: Option<String>,
    gemini_api_key: Option<String>,
}

/// Resolved gateway configuration
///
/// Missing credentials do not fail loading: the affected outbound client is
/// started in a degraded state and every send reports an upstream error that
/// the callers absorb.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Telephony gateway account name ("sandbox" selects the sandbox API host)
    pub at_username: String,
    /// Telephony gateway API key
    pub at_api_key: Option<String>,
    /// Sender ID / shortcode for outbound messages
    pub at_sender: Option<String>,
    /// Completion API key
    pub gemini_api_key: Option<String>,
}

impl GatewayConfig {
    /// Load configuration for the gateway service.
    ///
    /// Per-field priority: environment variable, then `config.toml` in the
    /// root folder, then compiled default.
    pub fn load(root: &Path) -> Result<GatewayConfig> {
        let toml_cfg = load_toml_config(root)?;

        let at_username = resolve_field(
            "SITESTOCK_AT_USERNAME",
            toml_cfg.at_username.as_deref(),
            "at_username",
        )
        .unwrap_or_else(|| "sandbox".to_string());

        let at_api_key = resolve_field(
            "SITESTOCK_AT_API_KEY",
            toml_cfg.at_api_key.as_deref(),
            "at_api_key",
        );
        let at_sender = resolve_field(
            "SITESTOCK_AT_SENDER",
            toml_cfg.at_sender.as_deref(),
            "at_sender",
        );
        let gemini_api_key = resolve_field(
            "SITESTOCK_GEMINI_API_KEY",
            toml_cfg.gemini_api_key.as_deref(),
            "gemini_api_key",
        );

        Ok(GatewayConfig {
            at_username,
            at_api_key,
            at_sender,
            gemini_api_key,
        })
    }
}

/// Resolve one credential field: environment variable wins over config file.
fn resolve_field(env_var: &str, toml_value: Option<&str>, field: &str) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            info!("{} loaded from environment variable", field);
            return Some(value);
        }
    }

    if let Some(value) = toml_value {
        if !value.trim().is_empty() {
            info!("{} loaded from config file", field);
            return Some(value.to_string());
        }
    }

    None
}

fn load_toml_config(root: &Path) -> Result<TomlConfig> {
    let path = root.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(TomlConfig::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins_root_folder_resolution() {
        let root = resolve_root_folder(Some(PathBuf::from("/tmp/sitestock-test")));
        assert_eq!(root, PathBuf::from("/tmp/sitestock-test"));
    }

    #[test]
    fn config_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = GatewayConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.at_username, "sandbox");
    }

    #[test]
    fn config_load_reads_toml_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "at_username = \"prod-account\"\nat_sender = \"10488\"\n",
        )
        .unwrap();

        let cfg = GatewayConfig::load(dir.path()).unwrap();
        assert_eq!(cfg.at_username, "prod-account");
        assert_eq!(cfg.at_sender.as_deref(), Some("10488"));
    }

    #[test]
    fn config_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "at_username = [broken").unwrap();

        let err = GatewayConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
