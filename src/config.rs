use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding `server_url`
pub const URL_ENV: &str = "AGENT_CHAT_URL";
/// Environment variable overriding `log_level`
pub const LOG_ENV: &str = "AGENT_CHAT_LOG";

const APP_DIR: &str = "agent-chat";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    pub fn load() -> ChatResult<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Missing file means defaults. `${VAR}` placeholders are expanded.
    pub fn load_from(path: &Path) -> ChatResult<Self> {
        Ok(Self::read_from(path)?.expanded())
    }

    /// Like [`Config::load_from`] but keeps placeholders as written
    pub fn read_from(path: &Path) -> ChatResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path).map_err(|source| ChatError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&config_content).map_err(|source| ChatError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> ChatResult<()> {
        let io_err = |source: std::io::Error| ChatError::ConfigIo {
            path: path.to_path_buf(),
            source,
        };

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let config_content = serde_json::to_string_pretty(self).map_err(|source| {
            ChatError::ConfigSerialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, config_content).map_err(io_err)
    }

    /// Apply `AGENT_CHAT_URL` / `AGENT_CHAT_LOG` on top of the file values
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(URL_ENV).filter(|v| !v.is_empty()) {
            self.server_url = url;
        }
        if let Some(level) = lookup(LOG_ENV).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
        self
    }

    pub fn validate(&self) -> ChatResult<()> {
        match reqwest::Url::parse(&self.server_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ChatError::InvalidUrl(self.server_url.clone())),
        }
    }

    fn expanded(self) -> Self {
        Self {
            server_url: substitute_env_vars(&self.server_url),
            log_level: substitute_env_vars(&self.log_level),
        }
    }

    pub fn get_config_path() -> ChatResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ChatError::NoDirectory("config"))?;
        Ok(config_dir.join(APP_DIR).join("config.json"))
    }

    pub fn log_path() -> ChatResult<PathBuf> {
        let cache_dir = dirs::cache_dir().ok_or(ChatError::NoDirectory("cache"))?;
        Ok(cache_dir.join(APP_DIR).join("agent-chat.log"))
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
/// Unset variables are left as written.
pub fn substitute_env_vars(input: &str) -> String {
    substitute_with(input, |name| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    placeholder_pattern()
        .replace_all(input, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
