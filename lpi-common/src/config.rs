//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-module TOML file inside the config directory
pub const CONFIG_FILE_NAME: &str = "lpi-ingest.toml";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "lpi.db";

/// Contents of the TOML configuration file
///
/// Every field is optional; missing values fall back to environment
/// variables or compiled defaults during resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the database
    pub root_folder: Option<String>,
    /// LinkedIn application and endpoint settings
    pub linkedin: LinkedInSection,
    /// Retry policy for idempotent upstream calls
    pub retry: RetrySection,
}

/// `[linkedin]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedInSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Redirect URI used when the import request does not carry one
    pub redirect_uri: Option<String>,
    pub oauth_base_url: Option<String>,
    pub api_base_url: Option<String>,
    pub www_base_url: Option<String>,
    /// Remote scrape RPC endpoint; in-process scraping when unset
    pub scraper_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// `[retry]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<Vec<u64>>,
}

/// Where a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingSource {
    CommandLine,
    Environment,
    Toml,
    Default,
}

impl std::fmt::Display for SettingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SettingSource::CommandLine => "command line",
            SettingSource::Environment => "environment",
            SettingSource::Toml => "TOML",
            SettingSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// Load TOML configuration from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load TOML configuration, tolerating a missing file
///
/// An explicit path that does not exist is an error; the default location
/// is optional and yields an empty config when absent.
pub fn load_config_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        return load_toml_config(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_toml_config(&path),
        _ => {
            tracing::debug!("No TOML config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Default configuration file path for the platform
///
/// Linux: `~/.config/lpi/lpi-ingest.toml`, falling back to `/etc/lpi/lpi-ingest.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("lpi").join(CONFIG_FILE_NAME));

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/lpi").join(CONFIG_FILE_NAME);
        match user_config {
            Some(path) if path.exists() => Some(path),
            _ if system_config.exists() => Some(system_config),
            other => other,
        }
    } else {
        user_config
    }
}

/// Root folder resolution priority:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> (PathBuf, SettingSource) {
    if let Some(path) = cli_arg {
        return (path.to_path_buf(), SettingSource::CommandLine);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if is_valid_value(&path) {
            return (PathBuf::from(path), SettingSource::Environment);
        }
    }

    if let Some(path) = toml_config.root_folder.as_deref() {
        if is_valid_value(path) {
            return (PathBuf::from(path), SettingSource::Toml);
        }
    }

    (get_default_root_folder(), SettingSource::Default)
}

/// Resolve a string setting with ENV → TOML priority
///
/// Warns when both sources carry a value, since the TOML value is then ignored.
pub fn resolve_setting(
    setting_name: &str,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<(String, SettingSource)> {
    let env_value = std::env::var(env_var_name).ok().filter(|v| is_valid_value(v));
    let toml_value = toml_value.filter(|v| is_valid_value(v));

    if env_value.is_some() && toml_value.is_some() {
        tracing::warn!(
            setting = setting_name,
            "Setting found in both environment ({}) and TOML. Using environment.",
            env_var_name
        );
    }

    if let Some(value) = env_value {
        return Some((value, SettingSource::Environment));
    }

    toml_value.map(|v| (v.to_string(), SettingSource::Toml))
}

/// Validate a configured value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Standard User-Agent for API clients that identify themselves
pub fn get_user_agent() -> String {
    format!("lpi-ingest/{}", env!("CARGO_PKG_VERSION"))
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/lpi (or /var/lib/lpi for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("lpi"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/lpi"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("lpi"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/lpi"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("lpi"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\lpi"))
    } else {
        PathBuf::from("./lpi_data")
    }
}
