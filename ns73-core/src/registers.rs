//! NS73 register map and local mirror
//!
//! The device is write-only, so the driver keeps the last value written to
//! each of the nine mirrored registers. Read-modify-write operations go
//! through the mirror, never through the bus.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::calibration::Cex;

/// Number of mirrored registers
pub const REGISTER_COUNT: usize = 9;

/// Highest address the wire format can carry
pub const MAX_ADDRESS: u8 = 0x0F;

/// Register addresses
pub mod reg {
    /// Power, mute, pre-emphasis, input attenuation
    pub const CONTROL: u8 = 0;
    /// Pilot tone / subcarrier
    pub const PILOT: u8 = 1;
    /// TX power and unlock detect
    pub const POWER: u8 = 2;
    /// Frequency divider low byte
    pub const FREQ_LOW: u8 = 3;
    /// Frequency divider high byte
    pub const FREQ_HIGH: u8 = 4;
    /// Main synthesizer charge pump current
    pub const CHARGE_PUMP: u8 = 6;
    /// Oscillator extension (CEX) band
    pub const BAND: u8 = 8;
    /// Software reset command (not mirrored)
    pub const SOFTWARE_RESET: u8 = 14;
}

/// Register 0 bits
pub mod control {
    /// Power enable
    pub const PE: u8 = 1 << 0;
    /// Crystal oscillator enable
    pub const PDX: u8 = 1 << 1;
    /// Audio mute
    pub const MUTE: u8 = 1 << 2;
    /// Pre-emphasis enable
    pub const EM: u8 = 1 << 4;
    /// 75 µs pre-emphasis (50 µs when clear)
    pub const EMS: u8 = 1 << 5;
    /// Input attenuation field
    pub const AG_MASK: u8 = 0xC0;
    /// Bit offset of the input attenuation field
    pub const AG_SHIFT: u8 = 6;
    /// Bits that count as "powered on"
    pub const POWER_MASK: u8 = PE | PDX;
}

/// Charge pump current while retuning (80 µA)
pub const CHARGE_PUMP_FAST: u8 = 0x1E;

/// Charge pump current once settled (1.25 µA)
pub const CHARGE_PUMP_IDLE: u8 = 0x1A;

/// Value written to [`reg::SOFTWARE_RESET`]
pub const SOFTWARE_RESET_VALUE: u8 = 0x05;

/// TX power field of register 2
pub const TX_POWER_MASK: u8 = 0x03;

/// Register values after power on
pub const POWER_ON_DEFAULTS: [u8; REGISTER_COUNT] =
    [0x00, 0xB4, 0x07, 0x00, 0x00, 0x00, 0x1E, 0x00, 0x1B];

/// Transmit power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum TxPower {
    /// 0.5 mW
    Low = 1,
    /// 1 mW
    Medium = 2,
    /// 2 mW
    #[default]
    High = 3,
}

impl TxPower {
    /// Register 2 with the power field replaced
    pub const fn apply(self, reg2: u8) -> u8 {
        (reg2 & !TX_POWER_MASK) | self as u8
    }
}

impl TryFrom<u8> for TxPower {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TxPower::Low),
            2 => Ok(TxPower::Medium),
            3 => Ok(TxPower::High),
            other => Err(other),
        }
    }
}

/// Audio input attenuation (full-scale input level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum InputAttenuation {
    /// 100 mV
    #[default]
    Mv100 = 0,
    /// 140 mV
    Mv140 = 1,
    /// 200 mV
    Mv200 = 2,
}

impl InputAttenuation {
    /// Register 0 with the attenuation field replaced
    pub const fn apply(self, reg0: u8) -> u8 {
        (reg0 & !control::AG_MASK) | ((self as u8) << control::AG_SHIFT)
    }
}

impl TryFrom<u8> for InputAttenuation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InputAttenuation::Mv100),
            1 => Ok(InputAttenuation::Mv140),
            2 => Ok(InputAttenuation::Mv200),
            other => Err(other),
        }
    }
}

/// Register 8 with the CEX field replaced
pub const fn with_cex(reg8: u8, cex: Cex) -> u8 {
    (reg8 & !Cex::MASK) | cex.value()
}

/// Local mirror of the writable registers
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterBank {
    regs: [u8; REGISTER_COUNT],
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self {
            regs: POWER_ON_DEFAULTS,
        }
    }
}

impl RegisterBank {
    /// Mirror holding the power-on defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value written to `address`, if it is mirrored
    pub fn get(&self, address: u8) -> Option<u8> {
        self.regs.get(address as usize).copied()
    }

    /// Record a write; returns whether the address is mirrored
    pub fn record(&mut self, address: u8, value: u8) -> bool {
        match self.regs.get_mut(address as usize) {
            Some(reg) => {
                *reg = value;
                true
            }
            None => false,
        }
    }

    /// Power enable or crystal bit set
    pub fn is_powered(&self) -> bool {
        self.regs[reg::CONTROL as usize] & control::POWER_MASK != 0
    }

    /// CEX currently programmed
    pub fn cex(&self) -> Cex {
        Cex::from_bits(self.regs[reg::BAND as usize])
    }

    /// All mirrored values, indexed by address
    pub fn as_bytes(&self) -> &[u8; REGISTER_COUNT] {
        &self.regs
    }
}
