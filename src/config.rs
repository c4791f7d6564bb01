//! # Configuration
//!
//! Serial line settings and gatherer tuning. Both structs have defaults
//! matching the charger family and can be loaded from JSON, where every field
//! is optional:
//!
//! ```json
//! { "variant": "UltraDuoPlus60", "serial": { "baudrate": 9600 }, "wait_time_retries": 60 }
//! ```

use crate::constants::{
    DEFAULT_BAUDRATE, FRAME_READ_TIMEOUT, MAX_SYNC_RETRIES, MIN_SESSION_SAMPLES,
    RESYNC_READ_TIMEOUT, WAIT_TIME_RETRIES,
};
use crate::device::DeviceVariant;
use crate::error::UltramatError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for serial connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baudrate: u32,
    pub frame_timeout_ms: u64,
    pub resync_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baudrate: DEFAULT_BAUDRATE,
            frame_timeout_ms: FRAME_READ_TIMEOUT.as_millis() as u64,
            resync_timeout_ms: RESYNC_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl SerialConfig {
    pub fn frame_timeout(&self) -> Duration {
        Duration::from_millis(self.frame_timeout_ms)
    }

    pub fn resync_timeout(&self) -> Duration {
        Duration::from_millis(self.resync_timeout_ms)
    }
}

/// Gatherer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GathererConfig {
    pub variant: DeviceVariant,
    pub serial: SerialConfig,
    /// Consecutive invalid frames before the read fails
    pub max_sync_retries: u32,
    /// Idle polling ticks before the gatherer gives up waiting
    pub wait_time_retries: u32,
    /// Sessions with this many samples or fewer are discarded
    pub min_session_samples: usize,
    /// Reject frames whose product code belongs to another variant
    pub check_product_code: bool,
}

impl Default for GathererConfig {
    fn default() -> Self {
        GathererConfig {
            variant: DeviceVariant::UltraDuoPlus60,
            serial: SerialConfig::default(),
            max_sync_retries: MAX_SYNC_RETRIES,
            wait_time_retries: WAIT_TIME_RETRIES,
            min_session_samples: MIN_SESSION_SAMPLES,
            check_product_code: true,
        }
    }
}

impl GathererConfig {
    pub fn for_variant(variant: DeviceVariant) -> Self {
        GathererConfig {
            variant,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, UltramatError> {
        let config: GathererConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, UltramatError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| UltramatError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), UltramatError> {
        if self.max_sync_retries == 0 {
            return Err(UltramatError::Config("max_sync_retries must be positive".into()));
        }
        if self.wait_time_retries == 0 {
            return Err(UltramatError::Config("wait_time_retries must be positive".into()));
        }
        if self.serial.baudrate == 0 {
            return Err(UltramatError::Config("baudrate must be positive".into()));
        }
        Ok(())
    }
}
