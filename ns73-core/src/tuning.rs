//! Channel tuning state machine
//!
//! A retune walks the synthesizer through a fixed sequence: raise the
//! charge pump current, program the divider, apply the stored calibration,
//! check lock (only when powered), search for a working calibration if the
//! lock is missing, then drop the charge pump back to idle current.
//!
//! ```text
//! Idle ─► ChargePumpHigh ─► FrequencyProgrammed ─► CalibrationApplied
//!                                                   │ online      │ offline
//!                                                   ▼             │
//!                                  LockGood ◄─── LockCheck        │
//!                                     │             │ unlocked    │
//!                                     │             ▼             │
//!                                     │      CalibrationSearch    │
//!                                     ▼             ▼             ▼
//!                                     └──────► ChargePumpLow ◄────┘
//!                                                   │
//!                                                   ▼
//!                                                 Idle
//! ```

use crate::calibration::Cex;

/// Tuning states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuneState {
    /// No retune in progress, charge pump at idle current
    #[default]
    Idle,
    /// Charge pump raised for fast settling
    ChargePumpHigh,
    /// Divider registers written
    FrequencyProgrammed,
    /// Stored CEX applied
    CalibrationApplied,
    /// Sampling the lock line
    LockCheck,
    /// PLL locked with the stored CEX
    LockGood,
    /// Trying CEX values until one locks
    CalibrationSearch,
    /// Charge pump returned to idle current
    ChargePumpLow,
}

/// Events that advance a retune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuneEvent {
    /// Charge pump switched to fast current
    Start,
    /// Divider low and high bytes written
    DividerWritten,
    /// CEX register matches the stored value
    CalibrationWritten,
    /// Chip is powered, lock can be checked
    Online,
    /// Chip is not powered, skip the lock check
    Offline,
    /// Majority of lock samples high
    Locked,
    /// Majority of lock samples low
    Unlocked,
    /// Lock handling done
    Finish,
    /// Charge pump switched back to idle current
    ChargePumpLowered,
}

impl TuneState {
    /// Process an event and return the next state
    ///
    /// Events that do not apply to the current state leave it unchanged.
    pub fn transition(self, event: TuneEvent) -> Self {
        use TuneEvent::*;
        use TuneState::*;

        match (self, event) {
            (Idle, Start) => ChargePumpHigh,
            (ChargePumpHigh, DividerWritten) => FrequencyProgrammed,
            (FrequencyProgrammed, CalibrationWritten) => CalibrationApplied,

            // Lock is only meaningful with the chip powered
            (CalibrationApplied, Online) => LockCheck,
            (CalibrationApplied, Offline) => ChargePumpLow,

            (LockCheck, Locked) => LockGood,
            (LockCheck, Unlocked) => CalibrationSearch,

            (LockGood, Finish) => ChargePumpLow,
            (CalibrationSearch, Finish) => ChargePumpLow,

            (ChargePumpLow, ChargePumpLowered) => Idle,

            _ => self,
        }
    }
}

/// Result of a retune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuneOutcome {
    /// Chip offline; registers programmed, lock not checked
    Staged,
    /// Locked with the stored calibration
    Locked,
    /// Stored calibration failed, this value locked and was saved
    Recalibrated(Cex),
    /// No calibration value locked; CEX 0 left active
    Unlocked,
}

impl TuneOutcome {
    /// PLL confirmed locked
    pub fn is_locked(&self) -> bool {
        matches!(self, TuneOutcome::Locked | TuneOutcome::Recalibrated(_))
    }
}
