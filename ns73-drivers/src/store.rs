//! Persistent CEX calibration table
//!
//! Wraps a [`ByteStore`] holding the validity marker and the packed
//! calibration table. Layout and packing live in
//! [`ns73_core::calibration`]; this module only moves bytes.

use ns73_core::calibration::{Cex, CexBands, Slot, MARKER, MARKER_OFFSET, TABLE_OFFSET};
use ns73_core::channel::Channel;
use ns73_hal::ByteStore;

/// Calibration table in persistent storage
pub struct CalibrationStore<S> {
    store: S,
}

impl<S: ByteStore> CalibrationStore<S> {
    /// Wrap a byte store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Marker byte present
    pub fn is_valid(&mut self) -> Result<bool, S::Error> {
        Ok(self.store.read_byte(MARKER_OFFSET)? == MARKER)
    }

    /// Write the marker and a fresh table from `bands`
    pub fn reset(&mut self, bands: &CexBands) -> Result<(), S::Error> {
        self.store.write_byte(MARKER_OFFSET, MARKER)?;
        for (i, byte) in bands.default_table().iter().enumerate() {
            self.store.write_byte(TABLE_OFFSET + i as u16, *byte)?;
        }
        Ok(())
    }

    /// Reset the table unless the marker is present
    ///
    /// Returns `true` if a reset was done.
    pub fn ensure_valid(&mut self, bands: &CexBands) -> Result<bool, S::Error> {
        if self.is_valid()? {
            return Ok(false);
        }

        #[cfg(feature = "defmt")]
        defmt::warn!("calibration marker missing, writing default table");

        self.reset(bands)?;
        Ok(true)
    }

    /// Stored CEX for a channel
    pub fn lookup(&mut self, channel: Channel) -> Result<Cex, S::Error> {
        let slot = Slot::of(channel);
        Ok(slot.unpack(self.store.read_byte(slot.offset)?))
    }

    /// Store a new CEX for a channel
    ///
    /// The packed byte is only written if it changes. Returns whether a
    /// write happened.
    pub fn modify(&mut self, channel: Channel, cex: Cex) -> Result<bool, S::Error> {
        let slot = Slot::of(channel);
        let old = self.store.read_byte(slot.offset)?;
        let new = slot.pack(old, cex);
        if new == old {
            return Ok(false);
        }
        self.store.write_byte(slot.offset, new)?;
        Ok(true)
    }

    /// Give the byte store back
    pub fn release(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ns73_core::calibration::{REGION_END, TABLE_LEN};
    use ns73_hal::RamStore;

    const SIZE: usize = 256;

    /// Byte store that counts writes
    struct CountingStore {
        inner: RamStore<SIZE>,
        writes: usize,
    }

    impl CountingStore {
        fn erased() -> Self {
            Self {
                inner: RamStore::erased(),
                writes: 0,
            }
        }
    }

    impl ByteStore for CountingStore {
        type Error = ns73_hal::EepromError;

        fn read_byte(&mut self, offset: u16) -> Result<u8, Self::Error> {
            self.inner.read_byte(offset)
        }

        fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), Self::Error> {
            self.writes += 1;
            self.inner.write_byte(offset, value)
        }
    }

    fn ch(index: u8) -> Channel {
        Channel::new(index).unwrap()
    }

    #[test]
    fn test_erased_store_is_invalid() {
        let mut store = CalibrationStore::new(RamStore::<SIZE>::erased());
        assert_eq!(store.is_valid(), Ok(false));
    }

    #[test]
    fn test_ensure_valid_resets_once() {
        let mut store = CalibrationStore::new(CountingStore::erased());
        let bands = CexBands::default();

        assert_eq!(store.ensure_valid(&bands), Ok(true));
        assert_eq!(store.store.writes, 1 + TABLE_LEN);
        assert_eq!(store.is_valid(), Ok(true));

        assert_eq!(store.ensure_valid(&bands), Ok(false));
        assert_eq!(store.store.writes, 1 + TABLE_LEN);
    }

    #[test]
    fn test_reset_gives_band_defaults() {
        let mut store = CalibrationStore::new(RamStore::<SIZE>::erased());
        store.reset(&CexBands::default()).unwrap();

        assert_eq!(store.lookup(ch(0)).unwrap().value(), 3);
        assert_eq!(store.lookup(ch(12)).unwrap().value(), 2);
        assert_eq!(store.lookup(ch(41)).unwrap().value(), 1);
        assert_eq!(store.lookup(ch(102)).unwrap().value(), 0);
    }

    #[test]
    fn test_reset_stays_inside_region() {
        let mut store = CalibrationStore::new(RamStore::<SIZE>::erased());
        store.reset(&CexBands::default()).unwrap();

        let image = store.release();
        let bytes = image.as_bytes();
        assert!(bytes[..MARKER_OFFSET as usize].iter().all(|&b| b == 0xFF));
        assert!(bytes[REGION_END as usize..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_wrong_marker_is_invalid() {
        let mut ram = RamStore::<SIZE>::erased();
        ram.write_byte(MARKER_OFFSET, 0x55).unwrap();
        let mut store = CalibrationStore::new(ram);
        assert_eq!(store.is_valid(), Ok(false));
    }

    #[test]
    fn test_modify_only_writes_changes() {
        let mut store = CalibrationStore::new(CountingStore::erased());
        store.reset(&CexBands::default()).unwrap();
        let after_reset = store.store.writes;

        // Channel 5 already defaults to 3
        assert_eq!(store.modify(ch(5), Cex::MAX), Ok(false));
        assert_eq!(store.store.writes, after_reset);

        assert_eq!(store.modify(ch(5), Cex::MIN), Ok(true));
        assert_eq!(store.store.writes, after_reset + 1);
        assert_eq!(store.lookup(ch(5)), Ok(Cex::MIN));

        // Neighbours sharing the byte are untouched
        for index in [4, 6, 7] {
            assert_eq!(store.lookup(ch(index)), Ok(Cex::MAX));
        }
    }

    #[test]
    fn test_store_errors_propagate() {
        let mut store = CalibrationStore::new(RamStore::<4>::erased());
        assert!(store.is_valid().is_err());
        assert!(store.lookup(ch(0)).is_err());
    }
}
