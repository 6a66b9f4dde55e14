//! Runtime configuration.
//!
//! Built once at startup from three layers, later layers winning:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. environment variables (a `.env` file is loaded first, if present)
//!
//! The result is immutable; the client and pipeline take it by value.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::dates::DateFormat;
use crate::error::ConfigError;
use crate::filter::{FilterSpec, INITIAL_FILTER};

pub const ENV_API_KEY: &str = "STOCK_API_KEY";
pub const ENV_BASE_URL: &str = "STOCK_API_BASE_URL";
pub const ENV_HISTORY_MODE: &str = "STOCK_HISTORY_MODE";

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Where historical candles come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryMode {
    /// Call the provider's candle endpoint.
    Live,
    /// Always serve the static fallback series.
    #[default]
    Mock,
}

impl FromStr for HistoryMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(HistoryMode::Live),
            "mock" => Ok(HistoryMode::Mock),
            other => Err(ConfigError::Invalid(format!(
                "unknown history mode '{other}' (expected 'live' or 'mock')"
            ))),
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryMode::Live => f.write_str("live"),
            HistoryMode::Mock => f.write_str("mock"),
        }
    }
}

/// Settings for the provider client.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Provider auth token. Not validated locally; an empty token simply
    /// makes the provider reject requests.
    pub token: String,
    pub history_mode: HistoryMode,
    /// Request timeout. `None` means requests may wait indefinitely.
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            history_mode: HistoryMode::default(),
            timeout_secs: None,
        }
    }
}

// Hand-written so the token never reaches logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("history_mode", &self.history_mode)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Settings for the chart pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub date_format: DateFormat,
    /// Filter a new pipeline starts on.
    pub default_filter: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            date_format: DateFormat::default(),
            default_filter: INITIAL_FILTER.to_string(),
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ClientConfig,
    pub chart: ChartConfig,
}

impl Config {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (`std::env::var` in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_API_KEY) {
            self.api.token = token;
        }
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.api.base_url = base_url;
        }
        if let Some(mode) = lookup(ENV_HISTORY_MODE) {
            self.api.history_mode = mode.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Defaults, then `path` if given, then `.env` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Invalid(format!("base_url '{}': {e}", self.api.base_url))
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid(format!(
                "base_url '{}' cannot be used as a base URL",
                self.api.base_url
            )));
        }
        if FilterSpec::find(&self.chart.default_filter).is_none() {
            return Err(ConfigError::Invalid(format!(
                "unknown default_filter '{}' (expected one of: {})",
                self.chart.default_filter,
                FilterSpec::names().collect::<Vec<_>>().join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.history_mode, HistoryMode::Mock);
        assert_eq!(config.api.timeout(), None);
        assert!(config.api.token.is_empty());
        assert_eq!(config.chart.default_filter, "1W");
        assert_eq!(config.chart.date_format.as_str(), DateFormat::DEFAULT);
    }

    #[test]
    fn parses_partial_toml() {
        let config = Config::from_toml(
            r#"
[api]
token = "abc"
history_mode = "live"
timeout_secs = 10

[chart]
date_format = "%Y-%m-%d"
"#,
        )
        .unwrap();
        assert_eq!(config.api.token, "abc");
        assert_eq!(config.api.history_mode, HistoryMode::Live);
        assert_eq!(config.api.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.chart.date_format.as_str(), "%Y-%m-%d");
        assert_eq!(config.chart.default_filter, "1W");
    }

    #[test]
    fn rejects_bad_date_format_in_toml() {
        let err = Config::from_toml("[chart]\ndate_format = \"%Q\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_unknown_history_mode_in_toml() {
        assert!(Config::from_toml("[api]\nhistory_mode = \"replay\"\n").is_err());
    }

    #[test]
    fn rejects_unknown_default_filter() {
        let err = Config::from_toml("[chart]\ndefault_filter = \"5Y\"\n").unwrap_err();
        assert!(err.to_string().contains("5Y"));
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = Config::from_toml("[api]\nbase_url = \"not a url\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn env_overrides_win() {
        let config = Config::default()
            .with_overrides(env(&[
                (ENV_API_KEY, "secret"),
                (ENV_BASE_URL, "http://127.0.0.1:9999/api/v1"),
                (ENV_HISTORY_MODE, "LIVE"),
            ]))
            .unwrap();
        assert_eq!(config.api.token, "secret");
        assert_eq!(config.api.base_url, "http://127.0.0.1:9999/api/v1");
        assert_eq!(config.api.history_mode, HistoryMode::Live);
    }

    #[test]
    fn env_rejects_unknown_mode() {
        let err = Config::default()
            .with_overrides(env(&[(ENV_HISTORY_MODE, "sometimes")]))
            .unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn debug_redacts_token() {
        let mut api = ClientConfig::default();
        api.token = "super-secret".into();
        let shown = format!("{api:?}");
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\ntoken = \"from-file\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.token, "from-file");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
