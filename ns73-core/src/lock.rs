//! PLL lock detection vote
//!
//! The TEB pin goes high while the synthesizer is locked, but it chatters
//! while the loop settles. A fixed number of samples is taken and the
//! majority decides.

/// Default number of TEB samples per check
pub const LOCK_SAMPLES: u8 = 50;

/// Default spacing between samples (µs)
pub const LOCK_SAMPLE_INTERVAL_US: u32 = 2500;

/// Majority vote over a fixed number of lock line samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockVote {
    total: u8,
    taken: u8,
    high: u8,
}

impl Default for LockVote {
    fn default() -> Self {
        Self::new(LOCK_SAMPLES)
    }
}

impl LockVote {
    /// Start a vote over `total` samples
    pub const fn new(total: u8) -> Self {
        Self {
            total,
            taken: 0,
            high: 0,
        }
    }

    /// Record one sample; ignored once the vote is complete
    pub fn record(&mut self, high: bool) {
        if self.is_complete() {
            return;
        }
        self.taken += 1;
        if high {
            self.high += 1;
        }
    }

    /// All samples taken
    pub fn is_complete(&self) -> bool {
        self.taken >= self.total
    }

    /// Strictly more than half of the total samples read high
    pub fn is_locked(&self) -> bool {
        u16::from(self.high) * 2 > u16::from(self.total)
    }
}
