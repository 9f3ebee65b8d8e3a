//! Configuration loader and validator for the shops bot.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub telegram: Telegram,
    pub catalog: Catalog,
    pub database: Database,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub refresh_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_search_limit() -> u32 {
    50
}

/// Telegram bot settings and deployment mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Telegram {
    pub bot_token: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub webhook: Option<Webhook>,
}

/// How updates are received from Telegram.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Poll,
    Webhook,
}

/// Webhook listener settings, required when `mode: webhook`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Webhook {
    pub public_url: String,
    pub listen_addr: String,
    pub port: u16,
}

/// Remote catalog feed settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub feed_url: String,
}

/// Storage settings. `DATABASE_URL` in the environment takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub url: String,
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.app.refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.app.fetch_timeout_secs)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.refresh_interval_secs == 0 {
        return Err(ConfigError::Invalid("app.refresh_interval_secs must be > 0"));
    }
    if cfg.app.fetch_timeout_secs == 0 {
        return Err(ConfigError::Invalid("app.fetch_timeout_secs must be > 0"));
    }
    if cfg.app.fetch_timeout_secs > cfg.app.refresh_interval_secs {
        return Err(ConfigError::Invalid(
            "app.fetch_timeout_secs must not exceed app.refresh_interval_secs",
        ));
    }
    if cfg.app.search_limit == 0 {
        return Err(ConfigError::Invalid("app.search_limit must be > 0"));
    }

    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }
    if cfg.telegram.mode == Mode::Webhook {
        let Some(webhook) = &cfg.telegram.webhook else {
            return Err(ConfigError::Invalid(
                "telegram.webhook is required when mode is webhook",
            ));
        };
        if webhook.public_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "telegram.webhook.public_url must be non-empty",
            ));
        }
        if webhook.listen_addr.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "telegram.webhook.listen_addr must be non-empty",
            ));
        }
        if webhook.port == 0 {
            return Err(ConfigError::Invalid("telegram.webhook.port must be > 0"));
        }
    }

    if cfg.catalog.feed_url.trim().is_empty() {
        return Err(ConfigError::Invalid("catalog.feed_url must be non-empty"));
    }

    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }

    Ok(())
}

/// Example YAML configuration, also used as a fixture in tests.
pub fn example() -> &'static str {
    r#"app:
  refresh_interval_secs: 300
  fetch_timeout_secs: 60
  search_limit: 50

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  mode: poll
  webhook:
    public_url: "https://bot.example.com"
    listen_addr: "0.0.0.0"
    port: 8443

catalog:
  feed_url: "https://example.com/api/shops"

database:
  url: "sqlite://data/shops.db"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.search_limit, 50);
        assert_eq!(cfg.telegram.mode, Mode::Poll);
    }

    #[test]
    fn search_limit_defaults_when_omitted() {
        let cfg: Config = serde_yaml::from_str(
            r#"app:
  refresh_interval_secs: 300
  fetch_timeout_secs: 60
telegram:
  bot_token: "t"
catalog:
  feed_url: "https://example.com/api/shops"
database:
  url: "sqlite://shops.db"
"#,
        )
        .unwrap();
        assert_eq!(cfg.app.search_limit, 50);
        validate(&cfg).unwrap();
    }

    #[test]
    fn invalid_bot_token() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.telegram.bot_token = "".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("telegram.bot_token")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_intervals() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.refresh_interval_secs = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.fetch_timeout_secs = cfg.app.refresh_interval_secs + 1;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("fetch_timeout_secs")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.search_limit = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn webhook_mode_requires_webhook_block() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.telegram.mode = Mode::Webhook;
        cfg.telegram.webhook = None;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("telegram.webhook")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.telegram.mode = Mode::Webhook;
        if let Some(webhook) = cfg.telegram.webhook.as_mut() {
            webhook.public_url = "".into();
        }
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_feed_url() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.catalog.feed_url = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("catalog.feed_url")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(example().as_bytes()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.app.refresh_interval_secs, 300);
        assert_eq!(cfg.catalog.feed_url, "https://example.com/api/shops");
    }
}
