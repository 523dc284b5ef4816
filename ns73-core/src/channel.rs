//! Channel table
//!
//! The transmitter covers the FM broadcast band in 0.2 MHz steps starting at
//! 87.5 MHz. Frequencies are handled as integers in tenths of a megahertz
//! (`895` = 89.5 MHz), which is also how they are shown on a display.

use core::fmt::Write;

use heapless::String;

/// Number of channels in the table
pub const CHANNEL_COUNT: usize = 103;

/// Frequency of channel 0 (tenths of MHz)
pub const BASE_FREQUENCY: u16 = 875;

/// Channel spacing (tenths of MHz)
pub const CHANNEL_STEP: u16 = 2;

/// Maximum length of a [`Channel::label`]
pub const MAX_LABEL_LEN: usize = 10;

/// PLL divider ratios, one per channel, in ascending frequency order
///
/// The first entry is 87.5 MHz, the last 107.9 MHz.
#[rustfmt::skip]
pub static DIVIDERS: [u16; CHANNEL_COUNT] = [
    10718, 10743, 10767, 10792, 10816, 10840, 10865, 10889, 10914, 10938, 10962, 10987, // 89.7
    11011, 11036, 11060, 11084, 11109, 11133, 11158, 11182, 11207, 11231, 11255, 11280, // 92.1
    11304, 11329, 11353, 11377, 11402, 11426, 11451, 11475, 11500, 11524, 11548, 11573, // 94.5
    11597, 11622, 11646, 11670, 11695, 11719, 11744, 11768, 11792, 11817, 11841, 11866, // 96.9
    11890, 11915, 11939, 11963, 11988, 12012, 12037, 12061, 12085, 12110, 12134, 12159, // 99.3
    12183, 12208, 12232, 12256, 12281, 12305, 12330, 12354, 12378, 12403, 12427, 12452, // 101.7
    12476, 12500, 12525, 12549, 12574, 12598, 12623, 12647, 12671, 12696, 12720, 12745, // 104.1
    12769, 12793, 12818, 12842, 12867, 12891, 12916, 12940, 12964, 12989, 13013, 13038, // 106.5
    13062, 13086, 13111, 13135, 13160, 13184, 13208,                                    // 107.9
];

/// A valid channel index (0..[`CHANNEL_COUNT`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(u8);

impl Channel {
    /// Lowest channel (87.5 MHz)
    pub const MIN: Channel = Channel(0);

    /// Highest channel (107.9 MHz)
    pub const MAX: Channel = Channel(CHANNEL_COUNT as u8 - 1);

    /// Create a channel from a table index
    ///
    /// Returns `None` if the index is past the end of the table.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Some(Channel(index))
        } else {
            None
        }
    }

    /// Resolve a frequency in tenths of MHz to a channel
    ///
    /// Frequencies between two channels round down. Anything below
    /// 87.5 MHz or past the top channel is rejected.
    pub fn from_frequency(tenths_mhz: u16) -> Option<Self> {
        let offset = tenths_mhz.checked_sub(BASE_FREQUENCY)?;
        let index = offset / CHANNEL_STEP;
        if index as usize >= CHANNEL_COUNT {
            return None;
        }
        Some(Channel(index as u8))
    }

    /// Table index of this channel
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Channel frequency in tenths of MHz
    pub const fn frequency(self) -> u16 {
        BASE_FREQUENCY + (self.0 as u16) * CHANNEL_STEP
    }

    /// PLL divider ratio for this channel
    pub fn divider(self) -> u16 {
        DIVIDERS[self.0 as usize]
    }

    /// Next channel up, staying on the top channel
    pub fn up(self) -> Self {
        if self < Self::MAX {
            Channel(self.0 + 1)
        } else {
            self
        }
    }

    /// Next channel down, staying on the bottom channel
    pub fn down(self) -> Self {
        Channel(self.0.saturating_sub(1))
    }

    /// Human readable frequency, e.g. `"89.5 MHz"`
    pub fn label(self) -> String<MAX_LABEL_LEN> {
        let mut label = String::new();
        let freq = self.frequency();
        // Capacity fits "107.9 MHz"
        let _ = write!(label, "{}.{} MHz", freq / 10, freq % 10);
        label
    }
}

impl TryFrom<u8> for Channel {
    type Error = u8;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Channel::new(index).ok_or(index)
    }
}

impl From<Channel> for u8 {
    fn from(channel: Channel) -> Self {
        channel.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_ascending() {
        for pair in DIVIDERS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_channel_bounds() {
        assert_eq!(Channel::new(0), Some(Channel::MIN));
        assert_eq!(Channel::new(102), Some(Channel::MAX));
        assert_eq!(Channel::new(103), None);
        assert_eq!(Channel::new(255), None);
    }

    #[test]
    fn test_frequency_of_channel() {
        assert_eq!(Channel::MIN.frequency(), 875);
        assert_eq!(Channel::MAX.frequency(), 1079);
        assert_eq!(Channel::new(10).unwrap().frequency(), 895);
    }

    #[test]
    fn test_frequency_to_channel() {
        assert_eq!(Channel::from_frequency(875), Some(Channel::MIN));
        assert_eq!(Channel::from_frequency(895), Channel::new(10));
        assert_eq!(Channel::from_frequency(1079), Some(Channel::MAX));

        // Between channels rounds down
        assert_eq!(Channel::from_frequency(896), Channel::new(10));
        assert_eq!(Channel::from_frequency(1080), Some(Channel::MAX));

        // Out of band
        assert_eq!(Channel::from_frequency(874), None);
        assert_eq!(Channel::from_frequency(0), None);
        assert_eq!(Channel::from_frequency(1081), None);
        assert_eq!(Channel::from_frequency(u16::MAX), None);
    }

    #[test]
    fn test_up_down_clamp() {
        assert_eq!(Channel::MAX.up(), Channel::MAX);
        assert_eq!(Channel::MIN.down(), Channel::MIN);

        let ch = Channel::new(50).unwrap();
        assert_eq!(ch.up().index(), 51);
        assert_eq!(ch.down().index(), 49);
    }

    #[test]
    fn test_divider_lookup() {
        assert_eq!(Channel::MIN.divider(), 10718);
        assert_eq!(Channel::MAX.divider(), 13208);
    }

    #[test]
    fn test_label() {
        assert_eq!(Channel::MIN.label().as_str(), "87.5 MHz");
        assert_eq!(Channel::MAX.label().as_str(), "107.9 MHz");
    }

    #[test]
    fn test_try_from() {
        assert_eq!(Channel::try_from(5u8).map(u8::from), Ok(5));
        assert_eq!(Channel::try_from(200u8), Err(200));
    }
}
