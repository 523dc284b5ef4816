//! TEB lock detector
//!
//! Samples the chip's TEB output at a fixed interval and takes a majority
//! vote. A check always takes the full sample count, locked or not.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;

use ns73_core::lock::{LockVote, LOCK_SAMPLES, LOCK_SAMPLE_INTERVAL_US};

/// Lock detector on the TEB input pin
pub struct LockDetector<P> {
    pin: P,
    samples: u8,
    interval_us: u32,
}

impl<P: InputPin> LockDetector<P> {
    /// Create a detector with the default 50 samples, 2.5 ms apart
    pub fn new(pin: P) -> Self {
        Self::with_timing(pin, LOCK_SAMPLES, LOCK_SAMPLE_INTERVAL_US)
    }

    /// Create a detector with custom sampling
    pub fn with_timing(pin: P, samples: u8, interval_us: u32) -> Self {
        Self {
            pin,
            samples,
            interval_us,
        }
    }

    /// Sample the lock line and report whether the PLL is locked
    pub fn has_lock<D: DelayNs>(&mut self, delay: &mut D) -> Result<bool, P::Error> {
        let mut vote = LockVote::new(self.samples);
        while !vote.is_complete() {
            vote.record(self.pin.is_high()?);
            delay.delay_us(self.interval_us);
        }
        Ok(vote.is_locked())
    }

    /// Give the pin back
    pub fn release(self) -> P {
        self.pin
    }
}
