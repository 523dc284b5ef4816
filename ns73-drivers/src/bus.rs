//! Three-wire serial bus
//!
//! The NS73 takes 12-bit frames on a write-only bus: a 4-bit register
//! address followed by an 8-bit value, both least significant bit first.
//! Data is sampled on the rising clock edge and a latch pulse commits the
//! frame.
//!
//! ```text
//! DATA   ─< a0 >< a1 >< a2 >< a3 >< d0 > ... < d7 >──────────
//! CLK    ___/‾\__/‾\__/‾\__/‾\__/‾\_  ...  _/‾\______________
//! LATCH  ______________________________________________/‾\___
//! ```
//!
//! Pulse widths are whatever back-to-back pin writes give; the chip's
//! minimum timings are far below a GPIO toggle on any supported MCU.

use embedded_hal::digital::{OutputPin, PinState};

/// Number of address bits in a frame
pub const ADDRESS_BITS: u8 = 4;

/// Number of value bits in a frame
pub const VALUE_BITS: u8 = 8;

/// Clock pulses with data high in the reset sequence
pub const RESET_CLOCKS: u8 = 26;

/// Write-only register bus
pub trait SerialBus {
    /// Error type for bus operations
    type Error;

    /// Resynchronize the chip's serial interface
    ///
    /// Must run once before the first register write. The caller is
    /// responsible for the settle delay afterwards.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Send one register write
    ///
    /// Only the low four bits of `address` are transmitted.
    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Self::Error>;
}

/// Bit-banged three-wire bus on GPIO pins
pub struct ThreeWireBus<DATA, CLK, LATCH> {
    data: DATA,
    clock: CLK,
    latch: LATCH,
}

impl<DATA, CLK, LATCH, E> ThreeWireBus<DATA, CLK, LATCH>
where
    DATA: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    LATCH: OutputPin<Error = E>,
{
    /// Create a bus from its three output pins
    ///
    /// Does not touch the pins.
    pub fn new(data: DATA, clock: CLK, latch: LATCH) -> Self {
        Self { data, clock, latch }
    }

    /// Give the pins back
    pub fn release(self) -> (DATA, CLK, LATCH) {
        (self.data, self.clock, self.latch)
    }

    fn strobe_clock(&mut self) -> Result<(), E> {
        self.clock.set_high()?;
        self.clock.set_low()
    }

    fn shift_out(&mut self, bits: u8, count: u8) -> Result<(), E> {
        for i in 0..count {
            self.data.set_state(PinState::from((bits >> i) & 1 == 1))?;
            self.strobe_clock()?;
        }
        Ok(())
    }
}

impl<DATA, CLK, LATCH, E> SerialBus for ThreeWireBus<DATA, CLK, LATCH>
where
    DATA: OutputPin<Error = E>,
    CLK: OutputPin<Error = E>,
    LATCH: OutputPin<Error = E>,
{
    type Error = E;

    fn reset(&mut self) -> Result<(), E> {
        // Both lines idle high, then a start condition
        self.data.set_high()?;
        self.clock.set_high()?;
        self.data.set_low()?;

        // Clock in a run of ones
        self.clock.set_low()?;
        self.data.set_high()?;
        for _ in 0..RESET_CLOCKS {
            self.strobe_clock()?;
        }

        // Repeated start
        self.clock.set_high()?;
        self.data.set_low()?;
        self.clock.set_low()?;

        // Stop, leaving the clock low
        self.clock.set_high()?;
        self.data.set_high()?;
        self.clock.set_low()
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), E> {
        self.shift_out(address, ADDRESS_BITS)?;
        self.shift_out(value, VALUE_BITS)?;

        self.latch.set_high()?;
        self.latch.set_low()
    }
}
