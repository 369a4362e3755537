// SPDX-License-Identifier: MIT

//! Run configuration

use serde::{Deserialize, Serialize};

use crate::sdk::error::ConfigError;

/// Default limit on step executions in one run
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Limits applied to a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum step executions on the coordinator; fan-out children are not counted
    pub max_steps: usize,
    /// Maximum fan-out children running at once (unbounded when `None`)
    pub max_concurrency: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_concurrency: None,
        }
    }
}

impl RunConfig {
    /// Defaults overridden by `FANOUT_MAX_STEPS` and `FANOUT_MAX_CONCURRENCY`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with a custom variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("FANOUT_MAX_STEPS") {
            config.max_steps = parse_positive("FANOUT_MAX_STEPS", &value)?;
        }
        if let Some(value) = lookup("FANOUT_MAX_CONCURRENCY") {
            config.max_concurrency = Some(parse_positive("FANOUT_MAX_CONCURRENCY", &value)?);
        }
        Ok(config)
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = Some(max_concurrency.max(1));
        self
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidSetting {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}
