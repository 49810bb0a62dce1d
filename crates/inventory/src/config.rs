//! Inventory service configuration.

use std::time::Duration;

use thiserror::Error;

/// Environment variable naming the service instance.
pub const NAME_ENV: &str = "SHELFLIFE_NAME";
/// Environment variable overriding the flush timeout, in milliseconds.
pub const FLUSH_TIMEOUT_ENV: &str = "SHELFLIFE_FLUSH_TIMEOUT_MS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Inventory service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Labels worker threads and log lines.
    pub name: String,
    /// Upper bound for [`InventoryService::flush`](crate::InventoryService::flush).
    pub flush_timeout: Duration,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            name: "inventory".to_string(),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

impl InventoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `SHELFLIFE_NAME` and `SHELFLIFE_FLUSH_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup(NAME_ENV) {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    var: NAME_ENV,
                    value: name.to_string(),
                    reason: "name cannot be empty".to_string(),
                });
            }
            config.name = name.to_string();
        }

        if let Some(raw) = lookup(FLUSH_TIMEOUT_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    var: FLUSH_TIMEOUT_ENV,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
            config.flush_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }
}
