//! Byte-addressable persistent storage
//!
//! The transmitter keeps its oscillator calibration in a tiny EEPROM-style
//! region: one validity marker byte followed by a packed table. Everything
//! it needs from non-volatile memory is a single-byte read and a single-byte
//! write, so that is all [`ByteStore`] asks for.

use crate::flash::{FlashError, FlashStorage, StorageKey};

/// Size of the emulated EEPROM image
///
/// Covers the calibration region (0x95..0xB0) with room to spare.
pub const EEPROM_SIZE: usize = 256;

/// Errors from byte store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EepromError {
    /// Offset lies outside the store
    OutOfBounds,
    /// Backing flash failed to persist or load the image
    Flash(FlashError),
}

impl From<FlashError> for EepromError {
    fn from(e: FlashError) -> Self {
        EepromError::Flash(e)
    }
}

impl core::fmt::Display for EepromError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EepromError::OutOfBounds => f.write_str("offset outside the byte store"),
            EepromError::Flash(e) => write!(f, "flash: {}", e),
        }
    }
}

impl core::error::Error for EepromError {}

/// Byte-addressable persistent store
///
/// Each call is one complete transaction on one storage cell. Callers must
/// not assume anything about neighbouring cells.
pub trait ByteStore {
    /// Error type for store operations
    type Error;

    /// Read the byte at `offset`
    fn read_byte(&mut self, offset: u16) -> Result<u8, Self::Error>;

    /// Write `value` at `offset`
    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), Self::Error>;
}

impl<S: ByteStore + ?Sized> ByteStore for &mut S {
    type Error = S::Error;

    fn read_byte(&mut self, offset: u16) -> Result<u8, Self::Error> {
        (**self).read_byte(offset)
    }

    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), Self::Error> {
        (**self).write_byte(offset, value)
    }
}

/// Runs every transaction of the wrapped store inside a critical section
///
/// Interrupts (and with them any timer activity) are masked for the
/// duration of a single read or write and restored to their previous state
/// afterwards. The section is exactly one cell wide.
#[derive(Debug)]
pub struct Atomic<S> {
    inner: S,
}

impl<S> Atomic<S> {
    /// Wrap a store
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Access the wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the store
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: ByteStore> ByteStore for Atomic<S> {
    type Error = S::Error;

    fn read_byte(&mut self, offset: u16) -> Result<u8, Self::Error> {
        critical_section::with(|_| self.inner.read_byte(offset))
    }

    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), Self::Error> {
        critical_section::with(|_| self.inner.write_byte(offset, value))
    }
}

/// Byte store backed by a RAM array
///
/// Erased cells read as `0xFF`, like a freshly erased EEPROM. Used as the
/// working image of flash-emulated EEPROM and as a host test double.
#[derive(Debug, Clone)]
pub struct RamStore<const N: usize> {
    cells: [u8; N],
}

impl<const N: usize> Default for RamStore<N> {
    fn default() -> Self {
        Self::erased()
    }
}

impl<const N: usize> RamStore<N> {
    /// Create a store with every cell erased
    pub const fn erased() -> Self {
        Self { cells: [0xFF; N] }
    }

    /// Create a store from an existing image
    pub const fn from_bytes(cells: [u8; N]) -> Self {
        Self { cells }
    }

    /// Raw image of the store
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.cells
    }

    /// Load an image, keeping erased cells past the end of `image`
    pub fn load(&mut self, image: &[u8]) {
        let len = image.len().min(N);
        self.cells[..len].copy_from_slice(&image[..len]);
    }
}

impl<const N: usize> ByteStore for RamStore<N> {
    type Error = EepromError;

    fn read_byte(&mut self, offset: u16) -> Result<u8, Self::Error> {
        self.cells
            .get(offset as usize)
            .copied()
            .ok_or(EepromError::OutOfBounds)
    }

    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), Self::Error> {
        let cell = self
            .cells
            .get_mut(offset as usize)
            .ok_or(EepromError::OutOfBounds)?;
        *cell = value;
        Ok(())
    }
}

/// EEPROM emulated on top of wear-leveled flash
///
/// Keeps the whole image in RAM and stores it as a single
/// [`StorageKey::EepromImage`] record. Reads never touch flash. A write
/// that changes a cell updates the RAM image inside a critical section,
/// then commits the image; the commit itself runs with interrupts enabled
/// because the flash driver may need them. A failed commit restores the
/// cell, so retrying the same write reaches flash.
pub struct FlashEeprom<F, const N: usize = EEPROM_SIZE> {
    image: Atomic<RamStore<N>>,
    flash: F,
}

impl<F: FlashStorage, const N: usize> FlashEeprom<F, N> {
    /// Load the image from flash
    ///
    /// A missing record gives an erased image (all `0xFF`).
    pub async fn mount(mut flash: F) -> Result<Self, EepromError> {
        let mut image = RamStore::erased();
        let mut buffer = [0u8; N];
        match flash.read(StorageKey::EepromImage, &mut buffer).await {
            Ok(len) => image.load(&buffer[..len]),
            Err(FlashError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(Self {
            image: Atomic::new(image),
            flash,
        })
    }

    /// Current RAM image
    pub fn image(&self) -> &[u8; N] {
        self.image.inner().as_bytes()
    }

    /// Give the flash storage back
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: FlashStorage, const N: usize> ByteStore for FlashEeprom<F, N> {
    type Error = EepromError;

    fn read_byte(&mut self, offset: u16) -> Result<u8, Self::Error> {
        self.image.read_byte(offset)
    }

    fn write_byte(&mut self, offset: u16, value: u8) -> Result<(), Self::Error> {
        let previous = self.image.read_byte(offset)?;
        if previous == value {
            return Ok(());
        }
        self.image.write_byte(offset, value)?;

        let image = self.image.inner().as_bytes();
        if let Err(e) = embassy_futures::block_on(self.flash.write(StorageKey::EepromImage, image)) {
            // The image must keep matching flash
            self.image.write_byte(offset, previous)?;
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_store_starts_erased() {
        let mut store = RamStore::<8>::erased();
        for offset in 0..8 {
            assert_eq!(store.read_byte(offset), Ok(0xFF));
        }
    }

    #[test]
    fn test_ram_store_write_read() {
        let mut store = RamStore::<8>::erased();
        store.write_byte(3, 0x56).unwrap();

        assert_eq!(store.read_byte(3), Ok(0x56));
        assert_eq!(store.read_byte(2), Ok(0xFF));
        assert_eq!(store.as_bytes()[3], 0x56);
    }

    #[test]
    fn test_ram_store_out_of_bounds() {
        let mut store = RamStore::<4>::erased();
        assert_eq!(store.read_byte(4), Err(EepromError::OutOfBounds));
        assert_eq!(store.write_byte(100, 1), Err(EepromError::OutOfBounds));
    }

    #[test]
    fn test_ram_store_load_partial_image() {
        let mut store = RamStore::<4>::erased();
        store.load(&[1, 2]);
        assert_eq!(store.as_bytes(), &[1, 2, 0xFF, 0xFF]);

        // Longer images are truncated
        store.load(&[9, 9, 9, 9, 9, 9]);
        assert_eq!(store.as_bytes(), &[9, 9, 9, 9]);
    }

    #[test]
    fn test_atomic_passes_through() {
        let mut store = Atomic::new(RamStore::<4>::erased());
        store.write_byte(1, 0x42).unwrap();

        assert_eq!(store.read_byte(1), Ok(0x42));
        assert_eq!(store.inner().as_bytes()[1], 0x42);
        assert_eq!(store.read_byte(9), Err(EepromError::OutOfBounds));
    }

    #[test]
    fn test_mut_ref_is_a_store() {
        fn write_through<S: ByteStore>(mut s: S) {
            let _ = s.write_byte(0, 7);
        }

        let mut store = RamStore::<2>::erased();
        write_through(&mut store);
        assert_eq!(store.as_bytes()[0], 7);
    }

    /// In-memory flash storage with a single record slot per key
    #[derive(Default)]
    struct MemFlash {
        record: Option<([u8; 64], usize)>,
        writes: usize,
        fail: bool,
    }

    impl FlashStorage for MemFlash {
        async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
            if self.fail {
                return Err(FlashError::Storage);
            }
            match (key, &self.record) {
                (StorageKey::EepromImage, Some((data, len))) => {
                    buffer[..*len].copy_from_slice(&data[..*len]);
                    Ok(*len)
                }
                _ => Err(FlashError::NotFound),
            }
        }

        async fn write(&mut self, _key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
            if self.fail {
                return Err(FlashError::Full);
            }
            let mut record = [0u8; 64];
            record[..data.len()].copy_from_slice(data);
            self.record = Some((record, data.len()));
            self.writes += 1;
            Ok(())
        }
    }

    fn mount(flash: MemFlash) -> Result<FlashEeprom<MemFlash, 16>, EepromError> {
        embassy_futures::block_on(FlashEeprom::mount(flash))
    }

    #[test]
    fn test_flash_eeprom_starts_erased() {
        let mut eeprom = mount(MemFlash::default()).unwrap();
        assert_eq!(eeprom.read_byte(0), Ok(0xFF));
        assert_eq!(eeprom.read_byte(16), Err(EepromError::OutOfBounds));
    }

    #[test]
    fn test_flash_eeprom_commits_changes_only() {
        let mut eeprom = mount(MemFlash::default()).unwrap();

        eeprom.write_byte(3, 0x56).unwrap();
        eeprom.write_byte(3, 0x56).unwrap();
        eeprom.write_byte(4, 0xFF).unwrap();

        let flash = eeprom.into_inner();
        assert_eq!(flash.writes, 1);

        // Image survives a remount
        let mut eeprom = mount(flash).unwrap();
        assert_eq!(eeprom.read_byte(3), Ok(0x56));
        assert_eq!(eeprom.image()[2], 0xFF);
    }

    #[test]
    fn test_flash_eeprom_errors() {
        let failing = MemFlash {
            fail: true,
            ..MemFlash::default()
        };
        assert_eq!(
            mount(failing).err(),
            Some(EepromError::Flash(FlashError::Storage))
        );

        let mut eeprom = mount(MemFlash::default()).unwrap();
        eeprom.flash.fail = true;
        assert_eq!(
            eeprom.write_byte(0, 1),
            Err(EepromError::Flash(FlashError::Full))
        );
    }

    #[test]
    fn test_flash_eeprom_failed_commit_can_be_retried() {
        let mut eeprom = mount(MemFlash::default()).unwrap();
        eeprom.flash.fail = true;
        assert_eq!(
            eeprom.write_byte(3, 0x56),
            Err(EepromError::Flash(FlashError::Full))
        );
        assert_eq!(eeprom.read_byte(3), Ok(0xFF));

        eeprom.flash.fail = false;
        eeprom.write_byte(3, 0x56).unwrap();

        let flash = eeprom.into_inner();
        assert_eq!(flash.writes, 1);
        let mut eeprom = mount(flash).unwrap();
        assert_eq!(eeprom.read_byte(3), Ok(0x56));
    }
}
