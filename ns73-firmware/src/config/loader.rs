//! Configuration persistence
//!
//! Loads the transmitter configuration override from flash storage.
//! Falls back to the embedded transmitter.toml if flash holds none.

use defmt::*;

use ns73_core::config::{parse_config, TransmitterConfig};
use ns73_hal_rp2040::flash::{FlashError, StorageKey};
use ns73_hal_rp2040::{FlashStorageTrait, Rp2040FlashStorage};

/// Maximum serialized config size (binary)
const MAX_CONFIG_SIZE: usize = 64;

/// Configuration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    /// Flash operation failed
    Flash(FlashError),
    /// Deserialization failed
    Deserialize,
    /// Stored values fail validation
    Invalid,
}

impl From<FlashError> for LoadError {
    fn from(e: FlashError) -> Self {
        LoadError::Flash(e)
    }
}

/// Load the configuration: flash override first, then the embedded default
pub async fn load_config(storage: &mut Rp2040FlashStorage<'_>, embedded: &str) -> TransmitterConfig {
    match load_override(storage).await {
        Ok(config) => {
            info!("Loaded transmitter configuration from flash");
            return config;
        }
        Err(LoadError::Flash(FlashError::NotFound)) => {
            debug!("No configuration override in flash");
        }
        Err(e) => {
            warn!("Ignoring stored configuration: {:?}", e);
        }
    }

    match parse_config(embedded) {
        Ok(config) => {
            info!("Using embedded transmitter.toml");
            config
        }
        Err(e) => {
            // build.rs validates transmitter.toml, so this only happens
            // if the two parsers disagree
            error!("Failed to parse embedded config: {:?}", e);
            TransmitterConfig::default()
        }
    }
}

async fn load_override(storage: &mut Rp2040FlashStorage<'_>) -> Result<TransmitterConfig, LoadError> {
    let mut buffer = [0u8; MAX_CONFIG_SIZE];
    let len = storage
        .read(StorageKey::TransmitterConfig, &mut buffer)
        .await?;

    debug!("Read {} bytes of configuration from flash", len);

    let config: TransmitterConfig =
        postcard::from_bytes(&buffer[..len]).map_err(|_| LoadError::Deserialize)?;
    config.validate().map_err(|_| LoadError::Invalid)?;

    log_config_summary(&config);
    Ok(config)
}

fn log_config_summary(config: &TransmitterConfig) {
    debug!(
        "  startup channel {}, online {}, muted {}",
        config.startup.channel, config.startup.online, config.startup.muted
    );
    debug!(
        "  bands {}/{}/{}",
        config.bands.band0_start, config.bands.band1_start, config.bands.band2_start
    );
}
