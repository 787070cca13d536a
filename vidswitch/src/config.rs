use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use include_dir::{Dir, include_dir};
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelRegistry};
use crate::playback::EngineConfig;

/// Embedded configuration directory.
static CONFIG_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/config");

const DEFAULT_CONFIG_FILE: &str = "default.yaml";
const DEFAULT_REFRESH_INTERVAL_MS: u64 = 300_000;

fn default_refresh_interval_ms() -> u64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_autoplay() -> bool {
    true
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8099))
}

/// Startup configuration. Not mutable at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub channels: Vec<Channel>,
}

/// Manifest backend endpoint and credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    pub url: String,
    #[serde(default)]
    pub token: String,
}

/// HTTP control surface settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl AppConfig {
    /**
        Load configuration from `path`, or the embedded default when `None`.

        The result is validated before it is returned.
    */
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_yaml(&contents)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::embedded()?,
        };
        Ok(config)
    }

    /// The configuration compiled into the binary.
    pub fn embedded() -> Result<Self> {
        let file = CONFIG_DIR
            .get_file(DEFAULT_CONFIG_FILE)
            .ok_or_else(|| anyhow!("Embedded {} is missing", DEFAULT_CONFIG_FILE))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| anyhow!("Embedded {} is not UTF-8", DEFAULT_CONFIG_FILE))?;
        Self::from_yaml(contents).context("Invalid embedded config")
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("backend.url must be an http(s) URL, got '{}'", url);
        }
        if self.refresh_interval_ms == 0 {
            bail!("refresh_interval_ms must be positive");
        }
        if self.registry()?.is_empty() {
            bail!("No channels configured");
        }
        Ok(())
    }

    /// Replace the configured bearer token, e.g. from the environment.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.backend.token = token;
        }
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn registry(&self) -> Result<ChannelRegistry> {
        ChannelRegistry::new(self.channels.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"
backend:
  url: https://api.example.com/mpd-url
  token: abc
channels:
  - id: CH-1
    name: One
"#;

    #[test]
    fn test_embedded_config_is_valid() {
        let config = AppConfig::embedded().expect("embedded config");
        assert_eq!(config.channels.len(), 3);
        assert_eq!(config.refresh_interval(), Duration::from_secs(300));
        assert!(config.autoplay);
        assert_eq!(config.server.listen.to_string(), "127.0.0.1:8099");
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.refresh_interval_ms, DEFAULT_REFRESH_INTERVAL_MS);
        assert!(config.autoplay);
        assert!(matches!(config.engine, EngineConfig::Probe));
        assert_eq!(config.server.listen, default_listen());
    }

    #[test]
    fn test_rejects_zero_interval() {
        let yaml = format!("{}refresh_interval_ms: 0\n", MINIMAL);
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_rejects_duplicate_and_missing_channels() {
        let duplicate = r#"
backend: { url: "https://api.example.com" }
channels:
  - { id: CH-1, name: One }
  - { id: CH-1, name: Uno }
"#;
        assert!(AppConfig::from_yaml(duplicate).is_err());

        let empty = "backend: { url: \"https://api.example.com\" }\nchannels: []\n";
        assert!(AppConfig::from_yaml(empty).is_err());
    }

    #[test]
    fn test_rejects_non_http_backend() {
        let yaml = MINIMAL.replace("https://api.example.com/mpd-url", "ftp://nope");
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_token_override() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.clone().with_token(None).backend.token, "abc");
        assert_eq!(config.clone().with_token(Some(" ".into())).backend.token, "abc");
        assert_eq!(config.with_token(Some("xyz".into())).backend.token, "xyz");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.backend.token, "abc");
        assert_eq!(config.registry().unwrap().len(), 1);
    }
}
