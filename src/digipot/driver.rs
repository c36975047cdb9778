//! DigiPot SPI driver.
//!
//! The part takes the wiper code as a single byte while chip select is
//! held **high** (board wiring inverts the usual sense).

use defmt::{info, warn};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;
use embedded_storage_async::nor_flash::NorFlash;

use super::Setpoint;
use crate::storage::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DigiPotError {
    Spi,
    ChipSelect,
}

pub struct DigiPot<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI: SpiBus, CS: OutputPin> DigiPot<SPI, CS> {
    pub fn new(spi: SPI, mut cs: CS) -> Self {
        // Deselected until the first transfer.
        let _ = cs.set_low();
        Self { spi, cs }
    }

    pub async fn write_code(&mut self, code: u8) -> Result<(), DigiPotError> {
        self.cs.set_high().map_err(|_| DigiPotError::ChipSelect)?;
        let transfer = match self.spi.write(&[code]).await {
            Ok(()) => self.spi.flush().await,
            Err(e) => Err(e),
        };
        // Always release, even after a failed transfer.
        let released = self.cs.set_low();
        transfer.map_err(|_| DigiPotError::Spi)?;
        released.map_err(|_| DigiPotError::ChipSelect)
    }

    pub async fn apply(&mut self, setpoint: Setpoint) -> Result<u8, DigiPotError> {
        let code = setpoint.code();
        self.write_code(code).await?;
        Ok(code)
    }
}

/// Program the stored (or default) setpoint, then apply setpoint commands
/// from the central as they arrive, persisting each one.
pub async fn run<SPI: SpiBus, CS: OutputPin, F: NorFlash>(
    mut pot: DigiPot<SPI, CS>,
    store: &mut SettingsStore<F>,
    commands: crate::ble::CommandReceiver,
) -> ! {
    let initial = store.load_setpoint().await;
    match pot.apply(initial).await {
        Ok(code) => info!("DigiPot programmed: {} -> code {}", initial, code),
        Err(e) => warn!("DigiPot programming failed: {}", e),
    }

    loop {
        let cmd = commands.receive().await;
        let Some(setpoint) = Setpoint::from_command(cmd) else {
            continue;
        };
        match pot.apply(setpoint).await {
            Ok(code) => {
                info!("DigiPot updated: {} -> code {}", setpoint, code);
                if let Err(e) = store.save_setpoint(setpoint).await {
                    warn!("Setpoint applied but not persisted: {}", e);
                }
            }
            Err(e) => warn!("DigiPot update failed: {}", e),
        }
    }
}
