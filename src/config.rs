// src/config.rs
//! Application configuration: blend weights, sector map, default portfolio,
//! analysis limits and provider settings.
//!
//! Resolution order:
//! 1) `$SENTIMENT_CONFIG_PATH`
//! 2) `config/sentiment.toml`
//! 3) `config/sentiment.json`
//!
//! Any problem is a [`ConfigError`] and is fatal at startup.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::blend::SentimentWeights;
use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "SENTIMENT_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/sentiment.toml";
pub const DEFAULT_JSON_PATH: &str = "config/sentiment.json";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sentiment_weights: SentimentWeights,
    pub sectors: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub portfolio: Vec<String>,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Most recent news items scored per symbol.
    pub news_limit: usize,
    /// Social posts requested per symbol (split across subreddits).
    pub social_limit: usize,
    /// Symbols analyzed concurrently in batch operations.
    pub max_concurrency: usize,
    /// Bound on each collaborator fetch for one symbol.
    pub symbol_timeout_secs: u64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            news_limit: 10,
            social_limit: 25,
            max_concurrency: 4,
            symbol_timeout_secs: 30,
        }
    }
}

impl AnalysisSettings {
    pub fn symbol_timeout(&self) -> Duration {
        Duration::from_secs(self.symbol_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    Http,
    Offline,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub mode: ProviderMode,
    pub user_agent: String,
    pub subreddits: Vec<String>,
    pub http_timeout_secs: u64,
    pub requests_per_minute: u32,
    pub max_concurrent_requests: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Http,
            user_agent: concat!("stock-sentiment-analyzer/", env!("CARGO_PKG_VERSION")).to_string(),
            subreddits: ["stocks", "investing", "SecurityAnalysis", "ValueInvesting", "StockMarket"]
                .into_iter()
                .map(String::from)
                .collect(),
            http_timeout_secs: 10,
            requests_per_minute: 60,
            max_concurrent_requests: 4,
        }
    }
}

impl AppConfig {
    /// Load and validate from an explicit path (TOML or JSON by extension).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = Self::parse(&content, &ext).map_err(|message| ConfigError::Parse {
            path: display,
            message,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks; no file at all is an error.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from(&Self::resolve_path()?)
    }

    pub fn resolve_path() -> Result<PathBuf, ConfigError> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Ok(pb);
            }
            return Err(ConfigError::Invalid(format!(
                "{ENV_CONFIG_PATH} points to non-existent path {}",
                pb.display()
            )));
        }
        for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Ok(pb);
            }
        }
        Err(ConfigError::Io {
            path: DEFAULT_TOML_PATH.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no configuration file found"),
        })
    }

    /// TOML when hinted, JSON otherwise; the other format is tried as a fallback.
    fn parse(s: &str, hint_ext: &str) -> Result<Self, String> {
        if hint_ext == "toml" {
            return toml::from_str(s).map_err(|e| e.to_string());
        }
        match serde_json::from_str(s) {
            Ok(cfg) => Ok(cfg),
            Err(json_err) => toml::from_str(s).map_err(|_| json_err.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sentiment_weights.validate().map_err(ConfigError::Invalid)?;

        for (sector, symbols) in &self.sectors {
            if sector.trim().is_empty() {
                return Err(ConfigError::Invalid("sectors: empty sector name".into()));
            }
            if symbols.is_empty() {
                return Err(ConfigError::Invalid(format!("sectors.{sector}: no symbols")));
            }
            if symbols.iter().any(|s| s.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!("sectors.{sector}: blank symbol")));
            }
        }
        if self.portfolio.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("portfolio: blank symbol".into()));
        }

        let a = &self.analysis;
        if a.max_concurrency == 0 {
            return Err(ConfigError::Invalid("analysis.max_concurrency must be >= 1".into()));
        }
        if a.symbol_timeout_secs == 0 {
            return Err(ConfigError::Invalid("analysis.symbol_timeout_secs must be >= 1".into()));
        }

        let p = &self.providers;
        if p.requests_per_minute == 0 || p.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "providers.requests_per_minute and providers.max_concurrent_requests must be >= 1"
                    .into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const TOML_CFG: &str = r#"
portfolio = ["AAPL", "MSFT"]

[sentiment_weights]
news = 0.6
social = 0.3
technical = 0.1

[sectors]
Technology = ["AAPL", "GOOGL", "MSFT"]
Banking = ["JPM", "BAC"]

[analysis]
max_concurrency = 2

[providers]
mode = "offline"
"#;

    const JSON_CFG: &str = r#"{
  "sentiment_weights": {"news": 0.5, "social": 0.5, "technical": 0.0},
  "sectors": {"Electric Vehicles": ["TSLA", "NIO", "RIVN"]}
}"#;

    #[test]
    fn parses_toml_with_defaults() {
        let cfg = AppConfig::parse(TOML_CFG, "toml").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.sectors["Technology"].len(), 3);
        assert_eq!(cfg.analysis.max_concurrency, 2);
        assert_eq!(cfg.analysis.news_limit, 10);
        assert_eq!(cfg.providers.mode, ProviderMode::Offline);
        assert_eq!(cfg.providers.subreddits.len(), 5);
    }

    #[test]
    fn parses_json_and_falls_back_by_content() {
        let cfg = AppConfig::parse(JSON_CFG, "json").unwrap();
        assert_eq!(cfg.sentiment_weights.social, 0.5);
        assert!(cfg.portfolio.is_empty());
        // Unknown extension: JSON first, then TOML.
        assert!(AppConfig::parse(TOML_CFG, "").is_ok());
    }

    #[test]
    fn missing_weights_is_a_parse_error() {
        let s = r#"{"sectors": {"Tech": ["AAPL"]}}"#;
        assert!(AppConfig::parse(s, "json").unwrap_err().contains("sentiment_weights"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = AppConfig::parse(JSON_CFG, "json").unwrap();
        cfg.sentiment_weights.news = -1.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        let mut cfg = AppConfig::parse(JSON_CFG, "json").unwrap();
        cfg.sectors.insert("Empty".into(), vec![]);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(m)) if m.contains("Empty")));

        let mut cfg = AppConfig::parse(JSON_CFG, "json").unwrap();
        cfg.analysis.max_concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.toml");
        fs::write(&p, "sentiment_weights = 3").unwrap();
        match AppConfig::load_from(&p) {
            Err(ConfigError::Parse { path, .. }) => assert!(path.ends_with("bad.toml")),
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(matches!(
            AppConfig::load_from(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // Nothing on disk → error.
        assert!(AppConfig::load_default().is_err());

        // Fallback JSON in ./config/
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_JSON_PATH), JSON_CFG).unwrap();
        let cfg = AppConfig::load_default().unwrap();
        assert!(cfg.sectors.contains_key("Electric Vehicles"));

        // Env wins.
        let p_env = tmp.path().join("custom.toml");
        fs::write(&p_env, TOML_CFG).unwrap();
        env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
        let cfg = AppConfig::load_default().unwrap();
        assert!(cfg.sectors.contains_key("Technology"));

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
        assert!(matches!(AppConfig::load_default(), Err(ConfigError::Invalid(_))));

        env::remove_var(ENV_CONFIG_PATH);
        env::set_current_dir(&old).unwrap();
    }
}
