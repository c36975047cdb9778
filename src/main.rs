//! SafeDC sensor firmware entry point (nRF52840 + SoftDevice S140).
//!
//! Startup order matters: the SoftDevice must be enabled before any
//! peripheral that shares interrupts or flash with it, and Embassy's own
//! interrupts must sit at priorities the SoftDevice leaves free.

#![no_std]
#![no_main]

use defmt::{error, info, unwrap};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::saadc::Input as _;
use embassy_nrf::{bind_interrupts, peripherals, spim};
use nrf_softdevice::{Flash, Softdevice};
use static_cell::StaticCell;

use safedc_sensor::ble::advertising::{advertising_data, scan_response_data};
use safedc_sensor::ble::gatt_server::SensorServer;
use safedc_sensor::ble::peripheral::{peripheral_task, AdvData};
use safedc_sensor::ble::{enable_softdevice, softdevice_task, CommandChannel, LinkEventChannel};
use safedc_sensor::config::{ADC_CHANNELS, DIGIPOT_SPI_FREQUENCY_HZ};
use safedc_sensor::control_task::control_task;
use safedc_sensor::digipot::driver::{self, DigiPot};
use safedc_sensor::led::{led_task, LED_PATTERN};
use safedc_sensor::sensor::saadc::{ChannelPins, SensorAdc};
use safedc_sensor::storage::SettingsStore;
use {defmt_rtt as _, panic_probe as _};

bind_interrupts!(struct SpiIrqs {
    SPIM3 => spim::InterruptHandler<peripherals::SPI3>;
});

static SERVER: StaticCell<SensorServer> = StaticCell::new();
static ADV: StaticCell<AdvData> = StaticCell::new();
static LINK_EVENTS: LinkEventChannel = LinkEventChannel::new();
static COMMANDS: CommandChannel = CommandChannel::new();

type PotSpi = spim::Spim<'static, peripherals::SPI3>;
type PotCs = Output<'static>;

#[embassy_executor::task]
async fn digipot_task(pot: DigiPot<PotSpi, PotCs>, mut store: SettingsStore<Flash>) -> ! {
    driver::run(pot, &mut store, COMMANDS.receiver()).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("SafeDC sensor starting");

    // Priorities P0 and P1 belong to the SoftDevice.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = enable_softdevice();
    let server = SERVER.init(unwrap!(SensorServer::register(sd)));
    let handles = server.handles();
    let adv = ADV.init(AdvData {
        adv: unwrap!(advertising_data()),
        scan_response: unwrap!(scan_response_data()),
    });
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    let store = SettingsStore::new(Flash::take(sd));

    interrupt::SPIM3.set_priority(Priority::P3);
    let mut spi_config = spim::Config::default();
    spi_config.frequency = match DIGIPOT_SPI_FREQUENCY_HZ {
        8_000_000.. => spim::Frequency::M8,
        4_000_000.. => spim::Frequency::M4,
        2_000_000.. => spim::Frequency::M2,
        _ => spim::Frequency::M1,
    };
    let spi = spim::Spim::new_txonly(p.SPI3, SpiIrqs, p.P0_19, p.P0_23, spi_config);
    let cs = Output::new(p.P0_22, Level::Low, OutputDrive::Standard);
    let pot = DigiPot::new(spi, cs);

    let pins = [
        ChannelPins { positive: p.P0_28.degrade_saadc(), negative: None },
        ChannelPins { positive: p.P0_29.degrade_saadc(), negative: None },
        ChannelPins { positive: p.P0_30.degrade_saadc(), negative: None },
        ChannelPins { positive: p.P0_31.degrade_saadc(), negative: None },
    ];
    let adc = match SensorAdc::new(p.SAADC, &ADC_CHANNELS, pins).await {
        Ok(adc) => adc,
        Err(e) => {
            // The radio keeps running; nothing samples or advertises.
            error!("ADC setup failed: {}, startup aborted", e);
            return;
        }
    };

    let led = Output::new(p.P0_14, Level::High, OutputDrive::Standard);

    unwrap!(spawner.spawn(led_task(led, &LED_PATTERN)));
    unwrap!(spawner.spawn(digipot_task(pot, store)));
    unwrap!(spawner.spawn(control_task(sd, handles, adc, LINK_EVENTS.receiver())));
    unwrap!(spawner.spawn(peripheral_task(
        sd,
        server,
        adv,
        LINK_EVENTS.sender(),
        COMMANDS.sender(),
        &LED_PATTERN,
    )));

    info!("All tasks spawned");
}
