//! Embassy async tasks
//!
//! The transmitter is owned by a single task; main only brings it up.

pub mod controls;

pub use controls::{controls_task, ControlsConfig};
