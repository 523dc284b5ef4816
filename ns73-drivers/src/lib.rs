//! Hardware drivers for the NS73 FM transmitter
//!
//! This crate drives the chip through `embedded-hal` pins and delays and a
//! [`ns73_hal::ByteStore`] for calibration data:
//!
//! - Three-wire serial bus (bit-banged, write only)
//! - TEB lock detector
//! - Persistent CEX calibration table
//! - The [`Ns73`] transmitter handle: bring-up, tuning, calibration search
//!   and audio/power settings

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bus;
pub mod lock;
pub mod store;
pub mod transmitter;

pub use bus::{SerialBus, ThreeWireBus};
pub use lock::LockDetector;
pub use store::CalibrationStore;
pub use transmitter::{Error, Ns73};
