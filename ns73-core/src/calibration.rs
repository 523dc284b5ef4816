//! Oscillator extension (CEX) calibration
//!
//! CEX is a coarse 2-bit adjustment of the synthesizer oscillator. Higher
//! frequencies want lower values; a wrong value keeps the PLL from locking.
//! Each channel has its own value, stored in a small persistent table
//! packed four channels per byte:
//!
//! ```text
//! offset  0x95          0x96                      0x96 + 25
//!         ┌──────┐      ┌────┬────┬────┬────┐     ┌────┬────┬────┬────┐
//!         │marker│      │ c3 │ c2 │ c1 │ c0 │ ... │  - │c102│c101│c100│
//!         └──────┘      └────┴────┴────┴────┘     └────┴────┴────┴────┘
//!                        bit 7            bit 0
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::{Channel, CHANNEL_COUNT};

/// Offset of the validity marker byte
pub const MARKER_OFFSET: u16 = 0x95;

/// Marker value meaning "table initialized, trust it"
pub const MARKER: u8 = 0x56;

/// Offset of the first packed table byte
pub const TABLE_OFFSET: u16 = 0x96;

/// Channels packed into one table byte
pub const CHANNELS_PER_BYTE: usize = 4;

/// Number of packed table bytes
pub const TABLE_LEN: usize = CHANNEL_COUNT.div_ceil(CHANNELS_PER_BYTE);

/// First offset past the calibration region
pub const REGION_END: u16 = TABLE_OFFSET + TABLE_LEN as u16;

/// A CEX value (0..=3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cex(u8);

impl Cex {
    /// Lowest setting, used by the highest channels
    pub const MIN: Cex = Cex(0);

    /// Highest setting, used by the lowest channels
    pub const MAX: Cex = Cex(3);

    /// Order in which a calibration search tries values
    pub const SEARCH_ORDER: [Cex; 4] = [Cex(3), Cex(2), Cex(1), Cex(0)];

    /// Bits occupied by CEX in a register or table byte
    pub const MASK: u8 = 0x03;

    /// Create a CEX value, rejecting anything above 3
    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Cex(value))
        } else {
            None
        }
    }

    /// Take the low two bits of `bits`
    pub const fn from_bits(bits: u8) -> Self {
        Cex(bits & Self::MASK)
    }

    /// Raw value (0..=3)
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Cex {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Cex::new(value).ok_or(value)
    }
}

/// Location of one channel's CEX value in the persistent store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot {
    /// Absolute store offset of the packed byte
    pub offset: u16,
    /// Bit position of the value inside that byte
    pub shift: u8,
}

impl Slot {
    /// Slot holding `channel`
    pub const fn of(channel: Channel) -> Self {
        let index = channel.index();
        Self {
            offset: TABLE_OFFSET + (index >> 2) as u16,
            shift: (index & 0x03) << 1,
        }
    }

    /// Extract this slot's value from a packed byte
    pub const fn unpack(self, byte: u8) -> Cex {
        Cex::from_bits(byte >> self.shift)
    }

    /// Replace this slot's value in a packed byte, keeping the other three
    pub const fn pack(self, byte: u8, cex: Cex) -> u8 {
        (byte & !(Cex::MASK << self.shift)) | (cex.value() << self.shift)
    }
}

/// Default CEX band boundaries
///
/// Channels at or above `band0_start` default to 0, at or above
/// `band1_start` to 1, at or above `band2_start` to 2, and everything
/// below to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CexBands {
    /// First channel of band 0 (highest frequencies)
    pub band0_start: u8,
    /// First channel of band 1
    pub band1_start: u8,
    /// First channel of band 2
    pub band2_start: u8,
}

impl Default for CexBands {
    fn default() -> Self {
        Self {
            band0_start: 71, // 101.7 MHz
            band1_start: 41, // 95.7 MHz
            band2_start: 12, // 89.9 MHz
        }
    }
}

impl CexBands {
    /// Check the boundaries are ordered and inside the table
    ///
    /// Empty bands are allowed: starting every band at 0 forces all
    /// channels to 0, which is useful to trigger a full recalibration.
    pub fn is_valid(&self) -> bool {
        self.band2_start <= self.band1_start
            && self.band1_start <= self.band0_start
            && (self.band0_start as usize) <= CHANNEL_COUNT
    }

    /// Default CEX for a channel
    pub fn default_for(&self, channel: Channel) -> Cex {
        let index = channel.index();
        if index >= self.band0_start {
            Cex(0)
        } else if index >= self.band1_start {
            Cex(1)
        } else if index >= self.band2_start {
            Cex(2)
        } else {
            Cex(3)
        }
    }

    /// Packed default table, ready to be written from [`TABLE_OFFSET`]
    ///
    /// Unused slots in the last byte are zero.
    pub fn default_table(&self) -> [u8; TABLE_LEN] {
        let mut table = [0u8; TABLE_LEN];
        for index in 0..CHANNEL_COUNT as u8 {
            if let Some(channel) = Channel::new(index) {
                let slot = Slot::of(channel);
                let i = (slot.offset - TABLE_OFFSET) as usize;
                table[i] = slot.pack(table[i], self.default_for(channel));
            }
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ch(index: u8) -> Channel {
        Channel::new(index).unwrap()
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(TABLE_LEN, 26);
        assert_eq!(REGION_END, 0xB0);
        assert!(MARKER_OFFSET < TABLE_OFFSET);
    }

    #[test]
    fn test_cex_range() {
        assert_eq!(Cex::new(3), Some(Cex::MAX));
        assert_eq!(Cex::new(4), None);
        assert_eq!(Cex::from_bits(0xFE).value(), 2);
        assert_eq!(Cex::try_from(7u8), Err(7));
    }

    #[test]
    fn test_search_order_descends_through_zero() {
        let values: [u8; 4] = Cex::SEARCH_ORDER.map(Cex::value);
        assert_eq!(values, [3, 2, 1, 0]);
    }

    #[test]
    fn test_slot_addressing() {
        assert_eq!(Slot::of(ch(0)), Slot { offset: 0x96, shift: 0 });
        assert_eq!(Slot::of(ch(3)), Slot { offset: 0x96, shift: 6 });
        assert_eq!(Slot::of(ch(4)), Slot { offset: 0x97, shift: 0 });
        assert_eq!(Slot::of(ch(102)), Slot { offset: 0x96 + 25, shift: 4 });
    }

    #[test]
    fn test_pack_unpack() {
        let slot = Slot::of(ch(5)); // shift 2
        let byte = slot.pack(0b1110_0111, Cex::new(2).unwrap());
        assert_eq!(byte, 0b1110_1011);
        assert_eq!(slot.unpack(byte).value(), 2);
    }

    #[test]
    fn test_default_bands() {
        let bands = CexBands::default();
        assert!(bands.is_valid());

        assert_eq!(bands.default_for(ch(0)).value(), 3);
        assert_eq!(bands.default_for(ch(11)).value(), 3);
        assert_eq!(bands.default_for(ch(12)).value(), 2);
        assert_eq!(bands.default_for(ch(40)).value(), 2);
        assert_eq!(bands.default_for(ch(41)).value(), 1);
        assert_eq!(bands.default_for(ch(70)).value(), 1);
        assert_eq!(bands.default_for(ch(71)).value(), 0);
        assert_eq!(bands.default_for(ch(102)).value(), 0);
    }

    #[test]
    fn test_default_table_bytes() {
        let table = CexBands::default().default_table();

        // Channels 0-3 are all band 3
        assert_eq!(table[0], 0xFF);
        // Channels 8-11 band 3, channel 12 starts band 2
        assert_eq!(table[2], 0xFF);
        assert_eq!(table[3], 0xAA);
        // Channels 68-71: 1, 1, 1, 0
        assert_eq!(table[17], 0b0001_0101);
        // Last byte holds channels 100-102, all band 0
        assert_eq!(table[25], 0x00);
    }

    #[test]
    fn test_default_table_matches_bands() {
        let bands = CexBands {
            band0_start: 90,
            band1_start: 50,
            band2_start: 5,
        };
        let table = bands.default_table();

        for index in 0..CHANNEL_COUNT as u8 {
            let slot = Slot::of(ch(index));
            let byte = table[(slot.offset - TABLE_OFFSET) as usize];
            assert_eq!(slot.unpack(byte), bands.default_for(ch(index)));
        }
    }

    #[test]
    fn test_band_validation() {
        let collapsed = CexBands {
            band0_start: 0,
            band1_start: 0,
            band2_start: 0,
        };
        assert!(collapsed.is_valid());
        assert_eq!(collapsed.default_for(ch(0)).value(), 0);

        let unordered = CexBands {
            band0_start: 10,
            band1_start: 20,
            band2_start: 5,
        };
        assert!(!unordered.is_valid());

        let past_end = CexBands {
            band0_start: 200,
            band1_start: 41,
            band2_start: 12,
        };
        assert!(!past_end.is_valid());
    }

    proptest! {
        #[test]
        fn prop_pack_keeps_neighbours(byte in any::<u8>(), index in 0u8..103, value in 0u8..4) {
            let slot = Slot::of(ch(index));
            let cex = Cex::new(value).unwrap();
            let packed = slot.pack(byte, cex);

            prop_assert_eq!(slot.unpack(packed), cex);

            // The three other channels sharing the byte are untouched
            for shift in [0u8, 2, 4, 6] {
                if shift != slot.shift {
                    prop_assert_eq!((packed >> shift) & 0x03, (byte >> shift) & 0x03);
                }
            }
        }
    }
}
