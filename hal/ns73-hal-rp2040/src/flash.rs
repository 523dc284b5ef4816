//! Flash storage driver for RP2040
//!
//! Uses sequential-storage for wear-leveled key-value storage in the last
//! 64KB of flash. Records are small: the 256-byte EEPROM image and the
//! postcard-encoded transmitter configuration.
//!
//! Implements the `FlashStorage` trait from `ns73-hal`.

use embassy_rp::dma::Channel;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use sequential_storage::cache::NoCache;
use sequential_storage::map;

pub use ns73_hal::flash::{FlashError, StorageKey};

/// Total flash on a Raspberry Pi Pico
pub const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// Size of the storage partition at the end of flash
pub const STORAGE_PARTITION_SIZE: usize = 64 * 1024;

/// First byte of the storage partition
pub const STORAGE_PARTITION_START: usize = FLASH_SIZE - STORAGE_PARTITION_SIZE;

/// Flash range handed to sequential-storage
pub const STORAGE_RANGE: core::ops::Range<u32> =
    (STORAGE_PARTITION_START as u32)..(FLASH_SIZE as u32);

/// Scratch buffer for one item (header, key and value)
const ITEM_BUFFER_SIZE: usize = 512;

/// RP2040 flash storage
pub struct Rp2040FlashStorage<'d> {
    flash: Flash<'d, FLASH, Async, FLASH_SIZE>,
}

impl<'d> Rp2040FlashStorage<'d> {
    /// Create a new flash storage instance
    pub fn new(flash: Peri<'d, FLASH>, dma: Peri<'d, impl Channel>) -> Self {
        Self {
            flash: Flash::new(flash, dma),
        }
    }

    /// Fetch a record and hand its bytes to `f`
    async fn fetch<R>(
        &mut self,
        key: StorageKey,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<Option<R>, FlashError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        let item = map::fetch_item::<StorageKey, &[u8], _>(
            &mut self.flash,
            STORAGE_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
        )
        .await
        .map_err(|_| FlashError::Storage)?;

        Ok(item.map(f))
    }
}

impl<'d> ns73_hal::FlashStorage for Rp2040FlashStorage<'d> {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let copied = self
            .fetch(key, |data| {
                let dest = buffer.get_mut(..data.len()).ok_or(FlashError::BufferTooSmall)?;
                dest.copy_from_slice(data);
                Ok(data.len())
            })
            .await?;

        copied.unwrap_or(Err(FlashError::NotFound))
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        let mut item_buffer = [0u8; ITEM_BUFFER_SIZE];

        map::store_item(
            &mut self.flash,
            STORAGE_RANGE,
            &mut NoCache::new(),
            &mut item_buffer,
            &key,
            &data,
        )
        .await
        .map_err(|e| match e {
            sequential_storage::Error::FullStorage => FlashError::Full,
            _ => FlashError::Storage,
        })
    }
}
