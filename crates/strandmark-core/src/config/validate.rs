//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::pipeline::constellation::MAX_GRID_SIZE;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.constellation.grid_size == 0 {
            return Err(ConfigError::ValidationError(
                "constellation.grid_size must be > 0".into(),
            ));
        }
        if self.constellation.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "constellation.grid_size must be <= {}",
                MAX_GRID_SIZE
            )));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "watch.poll_interval_ms must be > 0".into(),
            ));
        }
        if self.pipeline.event_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.event_buffer must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.registration.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "registration.connect_timeout_ms must be > 0".into(),
            ));
        }
        if self.registration.enabled && self.registration.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "registration.endpoint must be set when registration is enabled".into(),
            ));
        }
        if self.general.author.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "general.author must not be empty".into(),
            ));
        }
        Ok(())
    }
}
