//! Runtime settings: token, base URL, output directory and tunables.
//!
//! Settings come from an optional YAML file, then environment variables, then
//! CLI flags (applied by the caller). The token is never stored in the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, Result, SpaceOdtError};

use super::contract::{FeatureToggles, SpaceOdtConfig};

/// Default Webex API base URL.
pub const DEFAULT_BASE_URL: &str = "https://webexapis.com/v1";

/// Default artifacts directory.
pub const DEFAULT_OUT_DIR: &str = ".artifacts";

/// Environment variables checked for the token, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["WEBEX_ACCESS_TOKEN", "WEBEX_TOKEN"];

/// Default settings file name looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "spaceodt.yaml";

/// Settings loaded from `spaceodt.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Webex API base URL.
    pub base_url: String,
    /// Artifacts directory.
    pub out_dir: PathBuf,
    /// Export `group_members`.
    pub group_members: bool,
    /// Write report artifacts.
    pub write_report: bool,
    /// Write `cache.json`.
    pub write_cache: bool,
    /// HTTP timeout for API calls, in seconds.
    pub timeout_secs: u64,
    /// UI settings.
    pub ui: UiSettings,
    /// Location job tunables.
    pub jobs: JobSettings,
}

/// Local UI bind settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Location job tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Rows per chunk.
    pub chunk_size: usize,
    /// Concurrent rows per chunk.
    pub max_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            group_members: true,
            write_report: true,
            write_cache: true,
            timeout_secs: 30,
            ui: UiSettings::default(),
            jobs: JobSettings::default(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8765,
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            chunk_size: 200,
            max_concurrency: 20,
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds invalid values.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading settings from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        Self::parse_yaml(&content, Some(path))
    }

    /// Parses settings from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or holds invalid values.
    pub fn parse_yaml(content: &str, source: Option<&Path>) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: format!("YAML parse error: {e}"),
            location: source.map(|p| p.display().to_string()),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads the given file, or `spaceodt.yaml` when present, or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::load_file(path)?,
            None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
                Self::load_file(DEFAULT_SETTINGS_FILE)?
            }
            None => {
                debug!("No settings file, using defaults");
                Self::default()
            }
        };
        settings.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Applies environment overrides using the given lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup("WEBEX_BASE_URL").filter(|v| !v.trim().is_empty()) {
            debug!("Overriding base_url from environment");
            self.base_url = base_url;
        }
        if let Some(out_dir) = lookup("SPACEODT_OUT_DIR").filter(|v| !v.trim().is_empty()) {
            debug!("Overriding out_dir from environment");
            self.out_dir = PathBuf::from(out_dir);
        }
    }

    /// Export contract derived from these settings.
    #[must_use]
    pub fn contract(&self) -> SpaceOdtConfig {
        SpaceOdtConfig {
            toggles: FeatureToggles {
                group_members: self.group_members,
                report_enabled: self.write_report,
                cache_enabled: self.write_cache,
            },
            ..SpaceOdtConfig::default()
        }
    }

    /// Directory holding v2.1 provisioning inputs and state.
    #[must_use]
    pub fn v21_dir(&self) -> PathBuf {
        self.out_dir.join("v21")
    }

    /// Directory holding v2 softphone inputs and state.
    #[must_use]
    pub fn v2_dir(&self) -> PathBuf {
        self.out_dir.join("v2")
    }

    fn validate(&self) -> Result<()> {
        if self.jobs.chunk_size == 0 {
            return Err(ConfigError::invalid("jobs.chunk_size", "must be greater than zero").into());
        }
        if self.jobs.max_concurrency == 0 {
            return Err(
                ConfigError::invalid("jobs.max_concurrency", "must be greater than zero").into(),
            );
        }
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::invalid("base_url", "must be an http(s) URL").into());
        }
        Ok(())
    }
}

/// Resolves the Webex token from the process environment.
///
/// # Errors
///
/// Returns [`ConfigError::MissingToken`] when neither variable is set.
pub fn resolve_token() -> Result<String> {
    resolve_token_with(|name| std::env::var(name).ok())
}

/// Resolves the Webex token using the given lookup.
///
/// # Errors
///
/// Returns [`ConfigError::MissingToken`] when neither variable is set.
pub fn resolve_token_with(lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|token| !token.trim().is_empty())
        .ok_or(SpaceOdtError::Config(ConfigError::MissingToken))
}

/// Loads a `.env` file from the working directory if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv() -> Result<()> {
    let env_path = PathBuf::from(".env");
    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to load .env file: {e}"),
            location: Some(env_path.display().to_string()),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_token_prefers_access_token() {
        let vars = env(&[("WEBEX_ACCESS_TOKEN", "a"), ("WEBEX_TOKEN", "b")]);
        let token = resolve_token_with(|k| vars.get(k).cloned()).expect("token");
        assert_eq!(token, "a");
    }

    #[test]
    fn test_token_falls_back_to_webex_token() {
        let vars = env(&[("WEBEX_TOKEN", "b")]);
        let token = resolve_token_with(|k| vars.get(k).cloned()).expect("token");
        assert_eq!(token, "b");
    }

    #[test]
    fn test_missing_token() {
        let err = resolve_token_with(|_| None).expect_err("should fail");
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Missing Webex token"));
    }

    #[test]
    fn test_parse_partial_yaml_keeps_defaults() {
        let yaml = r"
out_dir: exports
ui:
  port: 9000
";
        let settings = Settings::parse_yaml(yaml, None).expect("parse");
        assert_eq!(settings.out_dir, PathBuf::from("exports"));
        assert_eq!(settings.ui.port, 9000);
        assert_eq!(settings.ui.host, "127.0.0.1");
        assert_eq!(settings.jobs.max_concurrency, 20);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let yaml = "jobs:\n  max_concurrency: 0\n";
        assert!(Settings::parse_yaml(yaml, None).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[("WEBEX_BASE_URL", "http://localhost:9999"), ("SPACEODT_OUT_DIR", "x")]);
        let mut settings = Settings::default();
        settings.apply_env_overrides(|k| vars.get(k).cloned());
        assert_eq!(settings.base_url, "http://localhost:9999");
        assert_eq!(settings.v21_dir(), PathBuf::from("x").join("v21"));
    }

    #[test]
    fn test_contract_follows_toggles() {
        let settings = Settings {
            group_members: false,
            write_cache: false,
            ..Settings::default()
        };
        let contract = settings.contract();
        assert!(!contract.toggles.group_members);
        assert!(contract.toggles.report_enabled);
        assert!(!contract.toggles.cache_enabled);
        assert_eq!(contract.enabled_modules, SpaceOdtConfig::default().enabled_modules);
    }
}
