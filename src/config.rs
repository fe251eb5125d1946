//! Local config file for API and release feed settings.
//!
//! Persists settings in `$HOME/.sitzungsverwaltung/config.toml` so the client
//! knows which TOP manager instance to talk to across sessions.
//!
//! The config path uses a hardcoded `$HOME/.sitzungsverwaltung` base on all
//! platforms rather than platform-aware config directories.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default API URL: a TOP manager running on the local machine.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Environment variable overriding the API URL.
pub const API_URL_ENV_VAR: &str = "SITZUNGSVERWALTUNG_API_URL";

/// Environment variable overriding the release feed URL.
pub const RELEASES_URL_ENV_VAR: &str = "SITZUNGSVERWALTUNG_RELEASES_URL";

const CONFIG_DIR_NAME: &str = ".sitzungsverwaltung";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Keys accepted by `config set` / `config unset`.
pub const CONFIG_KEYS: &[&str] = &["api_url", "releases_url", "auto_update"];

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    ConfigFile,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueSource::Flag => "command-line flag",
            ValueSource::Env => "environment",
            ValueSource::ConfigFile => "config file",
            ValueSource::Default => "built-in default",
        }
    }
}

/// Result of resolving the effective API URL through the layered config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApiUrl {
    pub url: String,
    pub source: ValueSource,
    /// Non-HTTPS URL pointing at something other than the local machine.
    pub is_insecure_remote: bool,
}

/// Persisted as TOML at `$HOME/.sitzungsverwaltung/config.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Base URL of the TOP manager API.
    pub api_url: Option<String>,
    /// `.../releases/latest` URL of the release feed used by `update`.
    pub releases_url: Option<String>,
    /// When true, `update` skips the confirmation prompt.
    pub auto_update: Option<bool>,
}

impl CliConfig {
    /// Returns `None` if `$HOME` cannot be determined.
    pub fn config_path() -> Option<PathBuf> {
        Some(Self::config_path_with_home(home_dir()?.as_path()))
    }

    pub fn config_path_with_home(home: &Path) -> PathBuf {
        home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
    }

    /// Load config from disk. Returns defaults if the file does not exist.
    ///
    /// Parse errors and I/O errors other than file-not-found are hard
    /// failures.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to read config file at {}", path.display()))
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path: $HOME is not set"))?;
        self.save_to(&path)
    }

    /// Save config to a specific path, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory at {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, &contents)
            .with_context(|| format!("failed to write config file at {}", path.display()))?;
        Ok(())
    }

    /// Set one key from its string form. Does not save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "api_url" | "releases_url" => {
                if value.is_empty() {
                    bail!("Value for '{key}' must not be empty. Use `config unset {key}` instead.");
                }
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    bail!("Value for '{key}' must be an http:// or https:// URL, got '{value}'");
                }
                let value = Some(value.to_string());
                if key == "api_url" {
                    self.api_url = value;
                } else {
                    self.releases_url = value;
                }
            }
            "auto_update" => self.auto_update = Some(parse_bool(value)?),
            _ => bail!(
                "Unknown config key '{key}'. Known keys: {}",
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Clear one key. Does not save.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        match key {
            "api_url" => self.api_url = None,
            "releases_url" => self.releases_url = None,
            "auto_update" => self.auto_update = None,
            _ => bail!(
                "Unknown config key '{key}'. Known keys: {}",
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn auto_update_enabled(&self) -> bool {
        self.auto_update.unwrap_or(false)
    }

    /// Resolve the effective API URL.
    ///
    /// Priority (highest wins):
    /// 1. `cli_override`, the `--api-url` flag
    /// 2. `SITZUNGSVERWALTUNG_API_URL`
    /// 3. `api_url` from the config file
    /// 4. `http://localhost:8080`
    ///
    /// Empty or whitespace-only values at any layer fall through.
    pub fn resolve_api_url(&self, cli_override: Option<&str>) -> ResolvedApiUrl {
        self.resolve_api_url_with_env(cli_override, std::env::var(API_URL_ENV_VAR).ok())
    }

    fn resolve_api_url_with_env(
        &self,
        cli_override: Option<&str>,
        env_value: Option<String>,
    ) -> ResolvedApiUrl {
        let (url, source) = layered(cli_override, env_value, self.api_url.clone())
            .unwrap_or_else(|| (DEFAULT_API_URL.to_string(), ValueSource::Default));

        let is_insecure_remote = !url.starts_with("https://") && !is_local_url(&url);
        ResolvedApiUrl {
            url,
            source,
            is_insecure_remote,
        }
    }

    /// Resolve the release feed URL: flag > env > config. There is no default.
    pub fn resolve_releases_url(&self, cli_override: Option<&str>) -> Option<(String, ValueSource)> {
        layered(
            cli_override,
            std::env::var(RELEASES_URL_ENV_VAR).ok(),
            self.releases_url.clone(),
        )
    }
}

fn layered(
    flag: Option<&str>,
    env: Option<String>,
    file: Option<String>,
) -> Option<(String, ValueSource)> {
    non_empty_trimmed(flag.map(str::to_string))
        .map(|v| (v, ValueSource::Flag))
        .or_else(|| non_empty_trimmed(env).map(|v| (v, ValueSource::Env)))
        .or_else(|| non_empty_trimmed(file).map(|v| (v, ValueSource::ConfigFile)))
}

fn is_local_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .unwrap_or(url);
    if rest.starts_with("[::1]") {
        return true;
    }
    let host = rest.split(['/', ':']).next().unwrap_or("");
    matches!(host, "localhost" | "127.0.0.1")
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => bail!("Expected a boolean (true/false), got '{value}'"),
    }
}

fn non_empty_trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
