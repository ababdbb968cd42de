use std::time::Duration;

use crate::config::{Config, ConfigError};
use crate::constants::DEFAULT_ENGINE_TIMEOUT;

/// Engine run settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker pool size; `None` uses the classifier's own preference.
    pub workers: Option<usize>,
    /// Bound on a whole run.
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            timeout: DEFAULT_ENGINE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            workers: config.workers,
            timeout: config.timeout,
        }
    }
}
