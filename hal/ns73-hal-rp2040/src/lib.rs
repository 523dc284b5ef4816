//! RP2040-specific HAL for the NS73 transmitter firmware
//!
//! GPIO and delays come straight from `embassy-rp`, which already
//! implements `embedded-hal` 1.0. What the RP2040 lacks is an EEPROM, so
//! this crate provides:
//!
//! - Flash storage driver (implements `ns73_hal::FlashStorage`)
//! - [`Rp2040Eeprom`], the calibration byte store emulated on that flash

#![no_std]

pub mod flash;

use ns73_hal::{FlashEeprom, EEPROM_SIZE};

// Re-export shared traits from ns73-hal for convenience
pub use ns73_hal::{ByteStore, FlashStorage as FlashStorageTrait, StorageKey};

pub use flash::Rp2040FlashStorage;

/// Emulated EEPROM backed by the RP2040's flash
pub type Rp2040Eeprom<'d> = FlashEeprom<Rp2040FlashStorage<'d>, EEPROM_SIZE>;
