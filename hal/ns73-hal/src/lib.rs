//! NS73 Hardware Abstraction Layer
//!
//! This crate defines the storage abstractions the transmitter driver
//! persists its calibration through. Chip-specific HALs (RP2040, ...)
//! implement them on top of whatever non-volatile memory they have.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  ns73-drivers / ns73-firmware           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  ns73-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  ns73-hal-    │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! GPIO and delays are taken straight from `embedded-hal` 1.0, so this
//! crate only covers persistence:
//!
//! - [`eeprom::ByteStore`] - byte-addressable store with atomic transactions
//! - [`eeprom::FlashEeprom`] - byte store emulated on wear-leveled flash
//! - [`flash::FlashStorage`] - wear-leveled key-value storage

#![no_std]
#![deny(unsafe_code)]

pub mod eeprom;
pub mod flash;

// Re-export key traits at crate root for convenience
pub use eeprom::{Atomic, ByteStore, EepromError, FlashEeprom, RamStore, EEPROM_SIZE};
pub use flash::{FlashError, FlashStorage, StorageKey};
