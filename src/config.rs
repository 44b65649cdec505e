//! Configuration loader and validator for the catalog loader and feed server.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
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
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub linkedin: LinkedIn,
    pub server: Server,
    pub feed: Feed,
}

/// Store location shared by both binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub db_path: Option<String>,
}

/// Upstream catalog API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkedIn {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for LinkedIn {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://www.linkedin.com/oauth/v2/accessToken".into(),
            api_base: "https://api.linkedin.com/".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Server {
    pub bind: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".into(),
        }
    }
}

/// Feed-level metadata written into every Atom document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Feed {
    pub id: String,
    pub title: String,
    pub alternate_link: String,
    pub self_link: String,
    pub cache_max_age_secs: u64,
}

impl Default for Feed {
    fn default() -> Self {
        Self {
            id: "http://localhost:8080/courses".into(),
            title: "LinkedIn Learning - New Courses".into(),
            alternate_link: "https://linkedin.com/learning".into(),
            self_link: "http://localhost:8080/courses".into(),
            cache_max_age_secs: 3600,
        }
    }
}

impl Config {
    /// Overlay values from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary lookup; blank values are ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("CLIENT_ID") {
            self.linkedin.client_id = v;
        }
        if let Some(v) = get("CLIENT_SECRET") {
            self.linkedin.client_secret = v;
        }
        if let Some(v) = get("DB_PATH") {
            self.app.db_path = Some(v);
        }
        if let Some(v) = get("BIND_ADDR") {
            self.server.bind = v;
        }
        self
    }

    /// The configured store path, if any non-blank value was provided.
    pub fn db_path(&self) -> Option<&str> {
        self.app
            .db_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn api_base(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.linkedin.api_base)
            .map_err(|_| ConfigError::Invalid("linkedin.api_base must be a valid URL"))
    }

    pub fn token_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.linkedin.token_url)
            .map_err(|_| ConfigError::Invalid("linkedin.token_url must be a valid URL"))
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, starts from the built-in defaults.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    cfg.api_base()?;
    cfg.token_url()?;
    if cfg.server.bind.trim().is_empty() {
        return Err(ConfigError::Invalid("server.bind must be non-empty"));
    }
    if cfg.feed.id.trim().is_empty() {
        return Err(ConfigError::Invalid("feed.id must be non-empty"));
    }
    if cfg.feed.title.trim().is_empty() {
        return Err(ConfigError::Invalid("feed.title must be non-empty"));
    }
    if cfg.feed.cache_max_age_secs == 0 {
        return Err(ConfigError::Invalid("feed.cache_max_age_secs must be > 0"));
    }
    Ok(())
}

/// Returns the example YAML content shipped with the README.
pub fn example() -> &'static str {
    r#"app:
  db_path: "./data/learning.db"

linkedin:
  client_id: "YOUR_CLIENT_ID"
  client_secret: "YOUR_CLIENT_SECRET"
  token_url: "https://www.linkedin.com/oauth/v2/accessToken"
  api_base: "https://api.linkedin.com/"

server:
  bind: "0.0.0.0:8080"

feed:
  id: "http://localhost:8080/courses"
  title: "LinkedIn Learning - New Courses"
  alternate_link: "https://linkedin.com/learning"
  self_link: "http://localhost:8080/courses"
  cache_max_age_secs: 3600
"#
}
