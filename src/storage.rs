//! Persistent settings in internal flash.
//!
//! Uses the nRF52840's internal flash via `sequential-storage` to keep the
//! DigiPot setpoint across resets. On target the flash is
//! `nrf_softdevice::Flash`, since the radio owns NVMC timing.
//!
//! Storage layout:
//!   - Key-value map; one item per setting.
//!   - `KEY_DIGIPOT_SETPOINT` → `Setpoint::to_bytes()` (5 bytes).
//!   - Pages are managed by `sequential-storage`, which handles wear
//!     levelling and garbage collection.

use defmt::{debug, error, info, warn};
use embedded_storage_async::nor_flash::NorFlash;
use sequential_storage::cache::NoCache;
use sequential_storage::map::{fetch_item, store_item};

use crate::config::{DIGIPOT_DEFAULT_CURRENT_UA, STORAGE_FLASH_PAGE_COUNT, STORAGE_FLASH_PAGE_START};
use crate::digipot::Setpoint;
use crate::error::Error;

/// Flash page size for nRF52840 (4 KB).
const FLASH_PAGE_SIZE: u32 = 4096;

/// Start address of our storage region.
const STORAGE_START: u32 = STORAGE_FLASH_PAGE_START * FLASH_PAGE_SIZE;

/// End address (exclusive) of our storage region.
const STORAGE_END: u32 = (STORAGE_FLASH_PAGE_START + STORAGE_FLASH_PAGE_COUNT) * FLASH_PAGE_SIZE;

const KEY_DIGIPOT_SETPOINT: u8 = 0x01;

/// Scratch buffer for one map item (key + header + value, word aligned).
const ITEM_BUF_SIZE: usize = 32;

pub struct SettingsStore<F> {
    flash: F,
    last_saved: Option<Setpoint>,
}

impl<F: NorFlash> SettingsStore<F> {
    pub fn new(flash: F) -> Self {
        Self {
            flash,
            last_saved: None,
        }
    }

    /// Stored setpoint, or the default current when flash holds none
    /// (or holds something unreadable).
    pub async fn load_setpoint(&mut self) -> Setpoint {
        let default = Setpoint::Current {
            microamps: DIGIPOT_DEFAULT_CURRENT_UA,
        };
        let mut buf = [0u8; ITEM_BUF_SIZE];

        let fetched = fetch_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_DIGIPOT_SETPOINT,
        )
        .await;

        let setpoint = match fetched {
            Ok(Some(data)) => match Setpoint::from_bytes(data) {
                Some(sp) => {
                    info!("Loaded setpoint from flash: {}", sp);
                    sp
                }
                None => {
                    warn!("Stored setpoint unreadable, using default");
                    default
                }
            },
            Ok(None) => {
                info!("No setpoint in flash, using default");
                default
            }
            Err(e) => {
                error!("Flash read error: {:?}", defmt::Debug2Format(&e));
                default
            }
        };
        self.last_saved = Some(setpoint);
        setpoint
    }

    /// Persist a setpoint. Writes only when it differs from the last one.
    pub async fn save_setpoint(&mut self, setpoint: Setpoint) -> Result<(), Error> {
        if self.last_saved == Some(setpoint) {
            debug!("SettingsStore: setpoint unchanged");
            return Ok(());
        }

        let mut buf = [0u8; ITEM_BUF_SIZE];
        let bytes = setpoint.to_bytes();
        let item: &[u8] = &bytes;

        match store_item::<u8, &[u8], _>(
            &mut self.flash,
            STORAGE_START..STORAGE_END,
            &mut NoCache::new(),
            &mut buf,
            &KEY_DIGIPOT_SETPOINT,
            &item,
        )
        .await
        {
            Ok(()) => {
                info!("Saved setpoint to flash: {}", setpoint);
                self.last_saved = Some(setpoint);
                Ok(())
            }
            Err(e) => {
                error!("Flash write error: {:?}", defmt::Debug2Format(&e));
                Err(Error::Storage)
            }
        }
    }
}
