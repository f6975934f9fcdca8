// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use tracing::debug;
use weft_core::SchedulerConfig;

use crate::{ConfigError, ConfigService, ConfigStore};

/// Key the scheduler tunables are stored under.
pub const SCHEDULER_CONFIG_KEY: &str = "scheduler";

/// Loads and validates the scheduler config, falling back to defaults when
/// nothing is stored.
pub fn load_scheduler_config<S: ConfigStore>(
    service: &ConfigService<S>,
) -> Result<SchedulerConfig, ConfigError> {
    let Some(config) = service.load::<SchedulerConfig>(SCHEDULER_CONFIG_KEY)? else {
        debug!(key = SCHEDULER_CONFIG_KEY, "no stored scheduler config, using defaults");
        return Ok(SchedulerConfig::default());
    };
    validate(&config)?;
    Ok(config)
}

/// Validates and persists `config`.
pub fn save_scheduler_config<S: ConfigStore>(
    service: &ConfigService<S>,
    config: &SchedulerConfig,
) -> Result<(), ConfigError> {
    validate(config)?;
    service.save(SCHEDULER_CONFIG_KEY, config)
}

/// A zero flush budget would yield after every chore. A zero retry limit is
/// fine: chores then fail on their first not-ready signal.
fn validate(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.flush_budget_micros == 0 {
        return Err(ConfigError::Invalid {
            key: SCHEDULER_CONFIG_KEY.to_owned(),
            reason: "flush_budget_micros must be positive",
        });
    }
    Ok(())
}
