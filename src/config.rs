//! Konya Water configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Konya Water configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Text-generation service configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Gateway behaviour
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` when given, else from the default location when it
    /// exists, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/konya-water/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join("konya-water").join("config.toml"))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// Which document store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store, nothing survives a restart
    Memory,
    /// Cloud Firestore over its REST API
    Firestore,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Firestore project id; read from `project_id_ref` when unset
    pub project_id: Option<String>,

    /// Environment variable holding the project id
    pub project_id_ref: String,

    /// Environment variable holding the Web API key
    pub api_key_ref: String,

    /// Firestore REST endpoint
    pub base_url: String,

    /// Firestore database name
    pub database: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Firestore,
            project_id: None,
            project_id_ref: "firebase_project_id".to_string(),
            api_key_ref: "firebase_api_key".to_string(),
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            database: "(default)".to_string(),
            timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Text-generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Disable to always serve the fallback analysis
    pub enabled: bool,

    /// Chat completions endpoint base
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_ref: String,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key_ref: "openai_api_key".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 60,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Gateway behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// How often callers waiting on another caller's initialization re-check
    pub init_poll_interval_ms: u64,

    /// Give up waiting after this long; `0` waits forever
    pub init_wait_timeout_ms: u64,

    /// User id used when a caller has no identity of its own
    pub default_user_id: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            init_poll_interval_ms: 100,
            init_wait_timeout_ms: 30_000,
            default_user_id: "current-user".to_string(),
        }
    }
}

impl GatewayConfig {
    pub fn init_poll_interval(&self) -> Duration {
        Duration::from_millis(self.init_poll_interval_ms.max(1))
    }

    pub fn init_wait_timeout(&self) -> Option<Duration> {
        match self.init_wait_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Resolve a secret from the environment.
///
/// `secret_ref` names an environment variable (e.g. `"openai_api_key"` →
/// reads `$OPENAI_API_KEY`). Both the original casing and the UPPER_CASE
/// form are tried. Empty values count as missing.
pub fn resolve_secret(secret_ref: &str) -> Option<String> {
    std::env::var(secret_ref)
        .or_else(|_| std::env::var(secret_ref.to_uppercase()))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.analysis.model, "gpt-4");
        assert_eq!(config.gateway.init_poll_interval(), Duration::from_millis(100));
        assert_eq!(
            config.gateway.init_wait_timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [store]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.project_id_ref, "firebase_project_id");
        assert_eq!(config.store.timeout(), Duration::from_secs(10));
        assert_eq!(config.server.port, 8787);
        assert!(config.analysis.enabled);
    }

    #[test]
    fn test_partial_sections_keep_other_fields() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9100

            [analysis]
            model = "gpt-4o"

            [gateway]
            default_user_id = "ev-1"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.analysis.model, "gpt-4o");
        assert_eq!(config.analysis.max_tokens, 1000);
        assert_eq!(config.gateway.default_user_id, "ev-1");
        assert_eq!(
            config.gateway.init_wait_timeout(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_unbounded_wait() {
        let config: AppConfig = toml::from_str(
            r#"
            [gateway]
            init_poll_interval_ms = 0
            init_wait_timeout_ms = 0
            "#,
        )
        .unwrap();
        assert!(config.gateway.init_wait_timeout().is_none());
        assert_eq!(config.gateway.init_poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhost = \"0.0.0.0\"\nport = 9000\ncors_origins = []"
        )
        .unwrap();
        let config = AppConfig::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.server.cors_origins.is_empty());
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let toml = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml.contains("[store]"));
        assert!(toml.contains("backend = \"firestore\""));
    }

    #[test]
    fn test_resolve_secret_missing() {
        assert!(resolve_secret("konya_water_test_definitely_unset").is_none());
    }
}
