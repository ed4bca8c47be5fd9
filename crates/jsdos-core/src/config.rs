//! Player Configuration
//!
//! The serializable part of the host-supplied configuration. Options that
//! carry function references (the event callback) are kept out of here and
//! live in the runtime's resource bridge instead.

use crate::errors::{DosError, Result};
use core::time::Duration;

/// Default location of the runtime script and its sibling assets
pub const DEFAULT_PATH_PREFIX: &str = "emulators/";

/// Default deferral applied to forwarded host events
pub const DEFAULT_EVENT_DELAY_MS: u64 = 4;

/// Upper bound accepted for the event deferral
pub const MAX_EVENT_DELAY_MS: u64 = 1000;

/// Default number of audit entries kept by the store
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

// ----------------------------------------------------------------------------
// Player Configuration
// ----------------------------------------------------------------------------

/// Configuration for one player session
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DosConfig {
    /// Prefix the runtime script (and its assets) is loaded from
    pub path_prefix: String,
    /// Deferral before a runtime event reaches the host callback
    pub event_delay_ms: u64,
    /// Number of transitions kept in the audit trail
    pub audit_capacity: usize,
}

impl Default for DosConfig {
    fn default() -> Self {
        Self {
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            event_delay_ms: DEFAULT_EVENT_DELAY_MS,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }
}

impl DosConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            path_prefix: "test/".to_string(),
            event_delay_ms: 1,
            audit_capacity: 100,
        }
    }

    /// Parse configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DosError::config_error(e.to_string()))
    }

    pub fn with_path_prefix(mut self, path_prefix: impl Into<String>) -> Self {
        self.path_prefix = path_prefix.into();
        self
    }

    pub fn with_event_delay_ms(mut self, event_delay_ms: u64) -> Self {
        self.event_delay_ms = event_delay_ms;
        self
    }

    pub fn with_audit_capacity(mut self, audit_capacity: usize) -> Self {
        self.audit_capacity = audit_capacity;
        self
    }

    /// Event deferral as a duration
    pub fn event_delay(&self) -> Duration {
        Duration::from_millis(self.event_delay_ms)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.audit_capacity == 0 {
            return Err(DosError::config_error("audit capacity must be greater than 0"));
        }
        if self.event_delay_ms > MAX_EVENT_DELAY_MS {
            return Err(DosError::config_error(format!(
                "event delay {}ms exceeds {}ms",
                self.event_delay_ms, MAX_EVENT_DELAY_MS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = DosConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.event_delay(), Duration::from_millis(4));
    }

    #[test]
    fn test_invalid_config_validation() {
        assert!(DosConfig::new().with_audit_capacity(0).validate().is_err());
        assert!(DosConfig::new().with_event_delay_ms(5000).validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config = DosConfig::from_json(r#"{ "pathPrefix": "/js-dos/" }"#).unwrap();
        assert_eq!(config.path_prefix, "/js-dos/");
        assert_eq!(config.event_delay_ms, DEFAULT_EVENT_DELAY_MS);

        assert!(DosConfig::from_json("{ nope").is_err());
    }
}
