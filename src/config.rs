//! Service configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then environment
//! variables, then command-line flags (applied by the binary).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::shared::{AppError, Result};

/// Config file looked up in the working directory when none is named
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub openai: OpenAiConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Records buffered between the orchestrator task and the response body
    pub stream_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
            stream_buffer: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
    /// Idle time after which a session is forgotten, for either backend
    pub session_ttl_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
            session_ttl_secs: 3600,
            connect_timeout_secs: 2,
        }
    }
}

impl RedisConfig {
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    /// URL safe to log
    pub fn redacted_url(&self) -> String {
        match self.password {
            Some(_) => format!("redis://:***@{}:{}/{}", self.host, self.port, self.db),
            None => self.url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Longest silence tolerated between two reads of a streamed response
    pub read_timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.openai.com/v1".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: None,
            read_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// JSON payload served by the search stage; the bundled sample when unset
    pub fixture_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from `path`, or from `config.toml` if present, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    tracing::debug!(
                        "Config file {} not found, using defaults and environment",
                        DEFAULT_CONFIG_FILE
                    );
                    Self::default()
                }
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_API_BASE") {
            self.openai.api_url = url;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.openai.model_name = model;
        }
        if let Some(host) = lookup("REDIS_HOST") {
            self.redis.host = host;
        }
        if let Some(port) = lookup("REDIS_PORT").and_then(|p| p.parse().ok()) {
            self.redis.port = port;
        }
        if let Some(password) = lookup("REDIS_PASSWORD") {
            self.redis.password = Some(password);
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.cors_origins.len(), 2);
        assert!(config.redis.enabled);
        assert_eq!(config.redis.url(), "redis://localhost:6379/0");
        assert_eq!(config.openai.model_name, "gpt-4o-mini");
        assert!(config.retrieval.fixture_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [redis]
            host = "cache.internal"
            password = "s3cret"

            [openai]
            model_name = "qwen3-32b"
            "#,
        )
        .unwrap();

        assert_eq!(config.redis.host, "cache.internal");
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.url(), "redis://:s3cret@cache.internal:6379/0");
        assert!(!config.redis.redacted_url().contains("s3cret"));
        assert_eq!(config.openai.model_name, "qwen3-32b");
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(AppConfig::from_toml_str("[server\nport = 1").is_err());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = AppConfig::from_toml_str("[openai]\nmodel_name = \"from-file\"").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_MODEL", "from-env"),
            ("OPENAI_API_KEY", "sk-test"),
            ("REDIS_PORT", "6380"),
            ("PORT", "not-a-number"),
        ]);
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.openai.model_name, "from-env");
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.redis.port, 6380);
        // Unparseable values are ignored
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_missing_named_file_is_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
