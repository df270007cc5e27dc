use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BackendError, Result};
use crate::payload::PayloadEncoding;

/// Highest SCK frequency the nRF24L01 accepts.
pub const MAX_SPEED_HZ: u32 = 8_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub spi_device: PathBuf,
    /// Kept well below the device ceiling for margin on long wiring.
    pub speed_hz: u32,
    pub ce_pin: u32,
    pub gpio_root: PathBuf,
    pub payload_encoding: PayloadEncoding,
    /// Number of transactions kept in the trace ring; 0 disables tracing.
    pub trace_capacity: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            spi_device: PathBuf::from("/dev/spidev1.0"),
            speed_hz: 500_000,
            // J4 (IO-Port#1) pin 1 on the ODROID-U3
            ce_pin: 199,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            payload_encoding: PayloadEncoding::Auto,
            trace_capacity: 0,
        }
    }
}

impl BackendConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BackendError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| BackendError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.speed_hz == 0 || self.speed_hz > MAX_SPEED_HZ {
            return Err(BackendError::Config(format!(
                "speed_hz {} outside 1..={MAX_SPEED_HZ}",
                self.speed_hz
            )));
        }
        if self.spi_device.as_os_str().is_empty() {
            return Err(BackendError::Config("spi_device is empty".into()));
        }
        Ok(())
    }

    /// `<gpio_root>/gpio<N>`, the per-pin control directory.
    pub fn ce_pin_dir(&self) -> PathBuf {
        self.gpio_root.join(format!("gpio{}", self.ce_pin))
    }
}
