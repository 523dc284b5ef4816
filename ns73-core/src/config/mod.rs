//! Transmitter configuration
//!
//! These types are shared by the driver and the firmware. The firmware
//! embeds a TOML file read by [`toml::parse_config`] and stores an
//! override in flash as postcard-serialized binary data.

pub mod toml;

pub use toml::{parse_config, ParseError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::CexBands;
use crate::channel::Channel;
use crate::lock::{LOCK_SAMPLES, LOCK_SAMPLE_INTERVAL_US};
use crate::registers::{InputAttenuation, TxPower};

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Band boundaries out of order or past the last channel
    InvalidBands,
    /// Startup channel outside the table
    InvalidChannel,
    /// Lock check with no samples
    NoLockSamples,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            ConfigError::InvalidBands => "CEX band starts out of order or out of range",
            ConfigError::InvalidChannel => "startup channel out of range",
            ConfigError::NoLockSamples => "lock check needs at least one sample",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for ConfigError {}

/// Delays used by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Wait after changing CEX (ms)
    pub cex_settle_ms: u32,
    /// Wait after each calibration search trial (ms)
    pub search_settle_ms: u32,
    /// TEB samples per lock check
    pub lock_samples: u8,
    /// Spacing between TEB samples (µs)
    pub lock_sample_interval_us: u32,
    /// Wait after the bus reset sequence (µs)
    pub bus_reset_settle_us: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cex_settle_ms: 175,
            search_settle_ms: 500,
            lock_samples: LOCK_SAMPLES,
            lock_sample_interval_us: LOCK_SAMPLE_INTERVAL_US,
            bus_reset_settle_us: 1000,
        }
    }
}

/// State applied once bring-up is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StartupConfig {
    /// Channel index to tune after bring-up
    pub channel: u8,
    /// Transmit power
    pub tx_power: TxPower,
    /// Audio input attenuation
    pub attenuation: InputAttenuation,
    /// Power up the transmitter
    pub online: bool,
    /// Start with audio muted
    pub muted: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            tx_power: TxPower::High,
            attenuation: InputAttenuation::Mv100,
            online: true,
            muted: false,
        }
    }
}

impl StartupConfig {
    /// Startup channel, if the index is valid
    pub fn channel(&self) -> Option<Channel> {
        Channel::new(self.channel)
    }
}

/// Complete transmitter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransmitterConfig {
    /// Delays and lock sampling
    pub timing: TimingConfig,
    /// Default calibration bands, used when the table is reset
    pub bands: CexBands,
    /// Initial transmitter state
    pub startup: StartupConfig,
}

impl TransmitterConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check values the driver relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bands.is_valid() {
            return Err(ConfigError::InvalidBands);
        }
        if self.startup.channel().is_none() {
            return Err(ConfigError::InvalidChannel);
        }
        if self.timing.lock_samples == 0 {
            return Err(ConfigError::NoLockSamples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TransmitterConfig::new();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.timing.cex_settle_ms, 175);
        assert_eq!(config.timing.search_settle_ms, 500);
        assert_eq!(config.timing.lock_samples, 50);
        assert_eq!(config.startup.channel(), Some(Channel::MIN));
    }

    #[test]
    fn test_invalid_startup_channel() {
        let mut config = TransmitterConfig::new();
        config.startup.channel = 103;
        assert_eq!(config.validate(), Err(ConfigError::InvalidChannel));
    }

    #[test]
    fn test_invalid_bands() {
        let mut config = TransmitterConfig::new();
        config.bands.band2_start = 60;
        assert_eq!(config.validate(), Err(ConfigError::InvalidBands));
    }

    #[test]
    fn test_zero_lock_samples() {
        let mut config = TransmitterConfig::new();
        config.timing.lock_samples = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoLockSamples));
    }
}
