//! Board-agnostic core logic for the NS73 FM transmitter
//!
//! This crate contains everything about the transmitter that does not
//! touch a pin or a storage cell:
//!
//! - Channel table (divider ratios for 87.5 - 107.9 MHz)
//! - Oscillator calibration (CEX) values, bands and packed table layout
//! - Register map and the local register mirror
//! - Lock detection majority vote
//! - Channel tuning state machine
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

pub mod calibration;
pub mod channel;
pub mod config;
pub mod lock;
pub mod registers;
pub mod tuning;
