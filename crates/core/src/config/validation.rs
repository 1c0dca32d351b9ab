//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `version` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `version` or `cache_prefix` contain whitespace, or the prefix is empty
    /// - `origin` is not an absolute http(s) URL
    /// - a `precache` entry is not root-relative, or the list is empty
    /// - `fallback_document` is not part of `precache`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version.is_empty() {
            return Err(ConfigError::Missing {
                field: "version".into(),
                hint: "Set SHELTER_VERSION to the deployment version tag".into(),
            });
        }
        if self.version.chars().any(char::is_whitespace) {
            return Err(invalid("version", "must not contain whitespace"));
        }

        if self.cache_prefix.is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must not contain whitespace"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.has_host() => {}
            Ok(origin) => {
                return Err(invalid("origin", format!("unsupported origin: {origin}")));
            }
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.precache.is_empty() {
            return Err(invalid("precache", "must list at least one path"));
        }
        if let Some(path) = self.precache.iter().find(|p| !p.starts_with('/')) {
            return Err(invalid("precache", format!("path must be root-relative: {path:?}")));
        }
        if !self.precache.contains(&self.fallback_document) {
            return Err(invalid(
                "fallback_document",
                format!("{} is not in the precache manifest", self.fallback_document),
            ));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.is_development() {
            tracing::warn!(version = %self.version, "development mode: caching and interception are disabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: Result<(), ConfigError>) -> Option<String> {
        match result {
            Err(ConfigError::Invalid { field, .. }) | Err(ConfigError::Missing { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_version() {
        let config = AppConfig { version: String::new(), ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Missing { field, .. }) if field == "version"));
    }

    #[test]
    fn test_validate_version_whitespace() {
        let config = AppConfig { version: "v 2".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("version"));
    }

    #[test]
    fn test_validate_empty_prefix() {
        let config = AppConfig { cache_prefix: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("cache_prefix"));
    }

    #[test]
    fn test_validate_origin() {
        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));

        let config = AppConfig { origin: "file:///var/www".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("origin"));

        let config = AppConfig { origin: "https://example.com/app/".into(), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_precache_relative_path() {
        let config = AppConfig { precache: vec!["/".into(), "index.html".into()], ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("precache"));
    }

    #[test]
    fn test_validate_empty_precache() {
        let config = AppConfig { precache: Vec::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("precache"));
    }

    #[test]
    fn test_validate_fallback_not_precached() {
        let config = AppConfig { fallback_document: "/offline.html".into(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("fallback_document"));
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() }; // 51MB
        assert_eq!(field_of(config.validate()).as_deref(), Some("max_bytes"));
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() }; // 5min 1sec
        assert_eq!(field_of(config.validate()).as_deref(), Some("timeout_ms"));
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        assert_eq!(field_of(config.validate()).as_deref(), Some("user_agent"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = AppConfig { max_bytes: 1, timeout_ms: 100, ..Default::default() }; // minimum valid values
        assert!(config.validate().is_ok());

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, timeout_ms: 300_000, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
