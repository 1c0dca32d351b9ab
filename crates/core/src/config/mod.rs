//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELTER_*)
//! 2. TOML config file (if SHELTER_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Both `mode` and `version` are fixed for the lifetime of a running instance;
//! changing either means deploying a new worker.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Whether the worker caches at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// No caching, no interception; every request goes to the network.
    Development,
    /// Versioned precache, offline fallback and background refresh.
    #[default]
    Production,
}

impl fmt::Display for DeployMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployMode::Development => write!(f, "development"),
            DeployMode::Production => write!(f, "production"),
        }
    }
}

/// How a class of requests is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStrategy {
    /// Live fetch first, cached copy only when the network fails.
    NetworkFirst,
    /// Cached copy immediately, refreshed from the network in the background.
    StaleWhileRevalidate,
    /// Cached copy if present, otherwise fetch and store.
    CacheFirst,
    /// Never touch the bucket.
    NetworkOnly,
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::NetworkFirst => write!(f, "network-first"),
            FetchStrategy::StaleWhileRevalidate => write!(f, "stale-while-revalidate"),
            FetchStrategy::CacheFirst => write!(f, "cache-first"),
            FetchStrategy::NetworkOnly => write!(f, "network-only"),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELTER_*)
/// 2. TOML config file (if SHELTER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Development (pass-through) or production (offline caching).
    ///
    /// Set via SHELTER_MODE environment variable.
    #[serde(default)]
    pub mode: DeployMode,

    /// Deployment version tag. Changing it invalidates every previous bucket.
    ///
    /// Set via SHELTER_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix shared by every bucket this site owns.
    ///
    /// Set via SHELTER_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin the root-relative manifest paths are resolved against.
    ///
    /// Set via SHELTER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Root-relative paths fetched and stored at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Document served to navigations when the network is unreachable.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// Strategy for non-navigation GET requests.
    #[serde(default = "default_asset_strategy")]
    pub asset_strategy: FetchStrategy,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELTER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "site-cache".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_fallback_document() -> String {
    "/index.html".into()
}

fn default_asset_strategy() -> FetchStrategy {
    FetchStrategy::StaleWhileRevalidate
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shelter-cache.sqlite")
}

fn default_user_agent() -> String {
    "shelter/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: DeployMode::default(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            precache: default_precache(),
            fallback_document: default_fallback_document(),
            asset_strategy: default_asset_strategy(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the bucket owned by this version: `<cache_prefix>-<version>`.
    pub fn bucket_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    pub fn is_development(&self) -> bool {
        self.mode == DeployMode::Development
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELTER_`
    /// 2. TOML file from `SHELTER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELTER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELTER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.mode, DeployMode::Production);
        assert_eq!(config.version, "v1");
        assert_eq!(config.cache_prefix, "site-cache");
        assert_eq!(config.precache, vec!["/", "/index.html", "/manifest.json"]);
        assert_eq!(config.fallback_document, "/index.html");
        assert_eq!(config.asset_strategy, FetchStrategy::StaleWhileRevalidate);
        assert_eq!(config.db_path, PathBuf::from("./shelter-cache.sqlite"));
        assert_eq!(config.user_agent, "shelter/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.max_bytes, 5_242_880);
    }

    #[test]
    fn test_bucket_name() {
        let config = AppConfig { cache_prefix: "osaka-cache".into(), version: "v7".into(), ..Default::default() };
        assert_eq!(config.bucket_name(), "osaka-cache-v7");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_load_from_env_and_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "shelter.toml",
                r#"
                version = "2024-05-01"
                precache = ["/", "/index.html"]
                asset_strategy = "cache-first"
                "#,
            )?;
            jail.set_env("SHELTER_CONFIG_FILE", "shelter.toml");
            jail.set_env("SHELTER_MODE", "development");
            jail.set_env("SHELTER_CACHE_PREFIX", "docs");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.mode, DeployMode::Development);
            assert_eq!(config.version, "2024-05-01");
            assert_eq!(config.bucket_name(), "docs-2024-05-01");
            assert_eq!(config.precache, vec!["/", "/index.html"]);
            assert_eq!(config.asset_strategy, FetchStrategy::CacheFirst);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELTER_VERSION", "has space");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }

    #[test]
    fn test_strategy_display_matches_serde() {
        let json = serde_json::to_string(&FetchStrategy::StaleWhileRevalidate).unwrap();
        assert_eq!(json, format!("\"{}\"", FetchStrategy::StaleWhileRevalidate));
    }
}
