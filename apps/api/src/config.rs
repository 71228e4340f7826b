//! API server configuration.
//!
//! Loaded from environment variables with fallback to defaults. Service
//! settings (Midtrans, worker, shipping) live in `CommerceConfig`; this only
//! covers what the HTTP process itself needs.

use std::env;
use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// HS256 secret shared with the token issuer
    pub jwt_secret: String,

    /// Optional path to `emporium.toml`
    pub commerce_config_path: Option<PathBuf>,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_port = match lookup("HTTP_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,
            None => 8080,
        };

        let database_path = lookup("DATABASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./emporium.db"));

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingRequired("JWT_SECRET".to_string()))?;

        let commerce_config_path = lookup("EMPORIUM_CONFIG")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(ApiConfig {
            http_port,
            database_path,
            jwt_secret,
            commerce_config_path,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, PathBuf::from("./emporium.db"));
        assert!(config.commerce_config_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("HTTP_PORT", "9090"),
            ("DATABASE_PATH", "/var/lib/emporium/shop.db"),
            ("EMPORIUM_CONFIG", "/etc/emporium/emporium.toml"),
        ]))
        .unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.database_path, PathBuf::from("/var/lib/emporium/shop.db"));
        assert_eq!(
            config.commerce_config_path,
            Some(PathBuf::from("/etc/emporium/emporium.toml"))
        );
    }

    #[test]
    fn test_jwt_secret_is_required() {
        let err = ApiConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired(ref key) if key == "JWT_SECRET"));
    }

    #[test]
    fn test_bad_port() {
        let err = ApiConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("HTTP_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
