use crate::error::{Result, WorkflowError};
use config::{Config, Environment};
use serde::Deserialize;

/// Engine-level configuration.
///
/// Loaded from defaults overlaid with `APPROVAL_`-prefixed environment
/// variables (e.g. `APPROVAL_EVENT_CAPACITY=256`).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the transition-event broadcast channel.
    pub event_capacity: usize,
    /// Default log filter directive.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("event_capacity", defaults.event_capacity as i64)
            .and_then(|builder| builder.set_default("log_level", defaults.log_level.as_str()))
            .map_err(|e| WorkflowError::Configuration(e.to_string()))?
            .add_source(Environment::with_prefix("APPROVAL"))
            .build()
            .map_err(|e| WorkflowError::Configuration(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| WorkflowError::Configuration(e.to_string()))
    }
}
