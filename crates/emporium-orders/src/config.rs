//! # Commerce Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MIDTRANS_SERVER_KEY=SB-Mid-server-...                              │
//! │     MIDTRANS_IS_PRODUCTION=false                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, or the platform config dir:                         │
//! │     ~/.config/emporium/emporium.toml (Linux)                           │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [midtrans]
//! server_key = "SB-Mid-server-xxxx"
//! client_key = "SB-Mid-client-xxxx"
//! is_production = false
//! is_3ds = true
//!
//! [worker]
//! poll_interval_secs = 5
//! max_attempts = 8
//!
//! [shipping]
//! zone_cache_ttl_secs = 3600
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ConfigError;

pub const SANDBOX_BASE_URL: &str = "https://app.sandbox.midtrans.com";
pub const PRODUCTION_BASE_URL: &str = "https://app.midtrans.com";

// =============================================================================
// Midtrans
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidtransSettings {
    /// Signs notifications and authenticates Snap API calls.
    #[serde(default)]
    pub server_key: String,

    /// Handed to the storefront for the Snap popup.
    #[serde(default)]
    pub client_key: String,

    #[serde(default)]
    pub is_production: bool,

    /// Request 3-D Secure for card payments.
    #[serde(default = "default_true")]
    pub is_3ds: bool,

    /// Overrides the environment-derived Snap base URL.
    #[serde(default)]
    pub snap_base_url: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for MidtransSettings {
    fn default() -> Self {
        MidtransSettings {
            server_key: String::new(),
            client_key: String::new(),
            is_production: false,
            is_3ds: default_true(),
            snap_base_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl MidtransSettings {
    /// Snap API base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        let base = match &self.snap_base_url {
            Some(url) => url.as_str(),
            None if self.is_production => PRODUCTION_BASE_URL,
            None => SANDBOX_BASE_URL,
        };
        base.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Worker
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Idle poll interval; the webhook also wakes the worker directly.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Notifications processed per wake-up before yielding.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Transient failures tolerated before a row is marked failed.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// How long a claimed row stays invisible to other workers.
    #[serde(default = "default_lease")]
    pub lease_secs: u64,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_batch_size() -> usize {
    50
}
fn default_max_attempts() -> u32 {
    8
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    300
}
fn default_lease() -> u64 {
    60
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            lease_secs: default_lease(),
        }
    }
}

impl WorkerSettings {
    /// Delay before retry number `attempts`: `initial · 2^attempts`, capped.
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        let cap = Duration::from_secs(self.max_backoff_secs);
        let factor = 2u64.checked_pow(attempts).unwrap_or(u64::MAX);
        let delay = Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor));
        delay.min(cap)
    }
}

// =============================================================================
// Shipping
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingSettings {
    #[serde(default = "default_zone_cache_ttl")]
    pub zone_cache_ttl_secs: u64,
}

fn default_zone_cache_ttl() -> u64 {
    3600
}

impl Default for ShippingSettings {
    fn default() -> Self {
        ShippingSettings {
            zone_cache_ttl_secs: default_zone_cache_ttl(),
        }
    }
}

// =============================================================================
// Root
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommerceConfig {
    #[serde(default)]
    pub midtrans: MidtransSettings,

    #[serde(default)]
    pub worker: WorkerSettings,

    #[serde(default)]
    pub shipping: ShippingSettings,
}

impl CommerceConfig {
    /// Loads defaults, then the TOML file (if present), then environment
    /// overrides, then validates.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading commerce config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.midtrans.server_key.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "midtrans.server_key must be set (or MIDTRANS_SERVER_KEY)".into(),
            ));
        }

        let base = Url::parse(self.midtrans.base_url())?;
        if base.scheme() != "https" && base.scheme() != "http" {
            return Err(ConfigError::InvalidUrl(format!(
                "Snap base URL must be http(s), got: {}",
                base
            )));
        }

        if self.worker.batch_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "worker.batch_size must be greater than 0".into(),
            ));
        }
        if self.worker.max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "worker.max_attempts must be greater than 0".into(),
            ));
        }
        if self.worker.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "worker.poll_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("MIDTRANS_SERVER_KEY") {
            debug!("Overriding Midtrans server key from environment");
            self.midtrans.server_key = key;
        }

        if let Ok(key) = std::env::var("MIDTRANS_CLIENT_KEY") {
            self.midtrans.client_key = key;
        }

        if let Ok(flag) = std::env::var("MIDTRANS_IS_PRODUCTION") {
            match flag.to_lowercase().as_str() {
                "true" | "1" => self.midtrans.is_production = true,
                "false" | "0" => self.midtrans.is_production = false,
                _ => warn!(value = %flag, "Ignoring invalid MIDTRANS_IS_PRODUCTION"),
            }
        }

        if let Ok(secs) = std::env::var("EMPORIUM_WORKER_POLL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                debug!(secs = s, "Overriding worker poll interval from environment");
                self.worker.poll_interval_secs = s;
            }
        }

        if let Ok(secs) = std::env::var("EMPORIUM_ZONE_CACHE_TTL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.shipping.zone_cache_ttl_secs = s;
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "emporium", "emporium")
            .map(|dirs| dirs.config_dir().join("emporium.toml"))
    }
}
