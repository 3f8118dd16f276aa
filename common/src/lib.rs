/*!
common/src/lib.rs

Shared configuration types for checkr.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- Helpers resolving secrets from the environment variables named in the config
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_LLM_TEMPERATURE: f32 = 0.4;
pub const DEFAULT_SEARCH_ENDPOINT: &str =
    "https://api.nytimes.com/svc/search/v2/articlesearch.json";
pub const DEFAULT_REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_REDDIT_API_URL: &str = "https://oauth.reddit.com";
pub const DEFAULT_USER_AGENT: &str = "checkr";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Which comment to check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Reddit comment permalink, e.g. "https://www.reddit.com/r/x/comments/abc/title/def/"
    pub permalink: Option<String>,
}

/// Reddit application credentials and endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditConfig {
    pub client_id_env: Option<String>,
    pub client_secret_env: Option<String>,
    pub user_agent: Option<String>,
    pub auth_url: Option<String>,
    pub api_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Chat-completions endpoint used to summarize the comment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
    pub timeout_seconds: Option<u64>,
    /// Ask the model for a JSON object instead of free text
    pub structured_output: Option<bool>,
}

/// News archive search API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub search_endpoint: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub target: Option<TargetConfig>,
    pub reddit: Option<RedditConfig>,
    pub llm: Option<LlmConfig>,
    pub archive: Option<ArchiveConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Permalink from `[target]`, if configured
    pub fn permalink(&self) -> Option<&str> {
        self.target.as_ref().and_then(|t| t.permalink.as_deref())
    }

    pub fn reddit(&self) -> RedditConfig {
        self.reddit.clone().unwrap_or_default()
    }

    pub fn llm(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    pub fn archive(&self) -> ArchiveConfig {
        self.archive.clone().unwrap_or_default()
    }
}

impl RedditConfig {
    pub fn client_id(&self) -> Result<String> {
        env_secret(self.client_id_env.as_deref().unwrap_or("REDDIT_CLIENT_ID"))
    }

    pub fn client_secret(&self) -> Result<String> {
        env_secret(self.client_secret_env.as_deref().unwrap_or("REDDIT_CLIENT_SECRET"))
    }
}

impl LlmConfig {
    pub fn api_key(&self) -> Result<String> {
        env_secret(self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY"))
    }
}

impl ArchiveConfig {
    pub fn api_key(&self) -> Result<String> {
        env_secret(self.api_key_env.as_deref().unwrap_or("NYT_API_KEY"))
    }
}

/// Read a secret from the named environment variable
pub fn env_secret(var: &str) -> Result<String> {
    std::env::var(var).with_context(|| format!("env var '{}' not set", var))
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
