//! Configuration loading
//!
//! Loads the transmitter configuration from flash or the embedded
//! transmitter.toml.

pub mod loader;

pub use loader::load_config;
