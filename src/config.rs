/// Configuration module for snippetfix.
///
/// Handles loading, validating, and providing default configuration values.
/// Every field has a default so an empty `{}` file is a valid configuration.
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "snippetfix.json";

// ── Default value functions ──────────────────────────────────────────

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_endpoint_path() -> String {
    "/fix-wpcode-snippet".to_string()
}

fn default_db_path() -> String {
    "./wordpress.db".to_string()
}

fn default_table_prefix() -> String {
    "wp_".to_string()
}

fn default_snippet_id() -> i64 {
    449
}

fn default_confirm_token() -> String {
    "fix".to_string()
}

fn default_required_capability() -> String {
    "manage_options".to_string()
}

fn default_verify_url() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

/// `(?-u:\s)` keeps whitespace ASCII-only, so NBSP and friends never match.
fn default_pattern() -> String {
    concat!(
        r"const(?-u:\s)+botAnswer(?-u:\s)*=(?-u:\s)*data\.answer(?-u:\s)*\|\|",
        r#"(?-u:\s)*data\.message(?-u:\s)*\|\|(?-u:\s)*['"].*?['"];?"#,
    )
    .to_string()
}

fn default_replacement() -> String {
    "const botAnswer = (data && data.answer) ? data.answer : (data && data.error) ? data.error : 'Cilad ayaa dhacday';"
        .to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Host table prefix, prepended to `wpcode_snippets` and `options`.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    #[serde(default = "default_snippet_id")]
    pub snippet_id: i64,

    /// Value the `run` query parameter must carry.
    #[serde(default = "default_confirm_token")]
    pub confirm_token: String,

    #[serde(default = "default_required_capability")]
    pub required_capability: String,

    /// Link shown on the success page so the operator can check the fix.
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    #[serde(default = "default_true")]
    pub flush_cache: bool,

    #[serde(default)]
    pub patch: PatchConfig,

    #[serde(default)]
    pub api_keys: Vec<ApiKeyConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PatchConfig {
    #[serde(default = "default_pattern")]
    pub pattern: String,

    #[serde(default = "default_replacement")]
    pub replacement: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ApiKeyConfig {
    pub key: String,
    pub user: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            endpoint_path: default_endpoint_path(),
            db_path: default_db_path(),
            table_prefix: default_table_prefix(),
            snippet_id: default_snippet_id(),
            confirm_token: default_confirm_token(),
            required_capability: default_required_capability(),
            verify_url: default_verify_url(),
            flush_cache: default_true(),
            patch: PatchConfig::default(),
            api_keys: Vec::new(),
        }
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            replacement: default_replacement(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to [`DEFAULT_CONFIG_PATH`].
    /// A missing file yields the default config; for the default path a
    /// template is written next to the binary so the operator can fill in keys.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        // Malformed config is fatal, never replaced by defaults.
        let cfg: Config =
            serde_json::from_str(&data).with_context(|| format!("invalid JSON in {path}"))?;

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        static PREFIX_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]*$").unwrap());

        anyhow::ensure!(
            PREFIX_RE.is_match(&self.table_prefix),
            "table_prefix may only contain ASCII letters, digits and '_'"
        );
        anyhow::ensure!(self.snippet_id > 0, "snippet_id must be positive");
        anyhow::ensure!(
            !self.confirm_token.is_empty(),
            "confirm_token must not be empty"
        );
        anyhow::ensure!(
            self.endpoint_path.starts_with('/') && self.endpoint_path.len() > 1,
            "endpoint_path must start with '/' and name a route"
        );
        anyhow::ensure!(
            !self.required_capability.is_empty(),
            "required_capability must not be empty"
        );
        anyhow::ensure!(
            !self.patch.pattern.is_empty(),
            "patch.pattern must not be empty"
        );
        for entry in &self.api_keys {
            anyhow::ensure!(
                !entry.key.is_empty(),
                "api key for user {} is empty",
                entry.user
            );
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.snippet_id, 449);
        assert_eq!(config.confirm_token, "fix");
        assert_eq!(config.required_capability, "manage_options");
        assert_eq!(config.table_prefix, "wp_");
        assert!(config.flush_cache);
        assert!(config.api_keys.is_empty());
        assert!(config.patch.replacement.contains("data.error"));
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"snippet_id": 12, "table_prefix": "site2_", "api_keys": [{"key": "k1", "user": "admin", "capabilities": ["manage_options"]}]}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.snippet_id, 12);
        assert_eq!(config.table_prefix, "site2_");
        assert_eq!(config.api_keys.len(), 1);
        // Other fields should have defaults
        assert_eq!(config.confirm_token, "fix");
        assert_eq!(config.patch.pattern, default_pattern());
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_prefix_injection() {
        let mut config = Config::default();
        config.table_prefix = "wp_; DROP TABLE users; --".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_snippet_id() {
        let mut config = Config::default();
        config.snippet_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_token() {
        let mut config = Config::default();
        config.confirm_token.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_endpoint_path() {
        let mut config = Config::default();
        config.endpoint_path = "/".to_string();
        assert!(config.validate().is_err());
        config.endpoint_path = "fix".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.snippet_id, 449);
        // Only the default path gets a template
        assert!(!path.exists());
    }

    #[test]
    fn test_load_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(Config::load(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.snippet_id, config.snippet_id);
        assert_eq!(parsed.patch.pattern, config.patch.pattern);
        assert_eq!(parsed.patch.replacement, config.patch.replacement);
    }
}
