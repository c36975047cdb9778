//! Advertise, accept one central, run the GATT server, repeat.

use core::cell::RefCell;

use defmt::{error, info, warn};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{Duration, Timer};
use nrf_softdevice::ble::{gatt_server, peripheral, Connection};
use nrf_softdevice::Softdevice;

use super::advertising::AdvPayload;
use super::alert::AlertLevel;
use super::bonder::bonder;
use super::gatt_server::{SensorServer, ServerEvent};
use super::{CommandSender, LinkEvent, LinkEventSender};
use crate::config::{ADV_INTERVAL, DEVICE_NAME};
use crate::led::LedSignal;
use crate::led_logic::pattern_for;

/// Connection the control task pushes readings to, if any.
static CURRENT_LINK: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// Clone of the current connection handle.
pub fn current_link() -> Option<Connection> {
    CURRENT_LINK.lock(|link| link.borrow().clone())
}

fn set_current_link(conn: Option<Connection>) {
    CURRENT_LINK.lock(|link| *link.borrow_mut() = conn);
}

/// Payloads built once at startup.
pub struct AdvData {
    pub adv: AdvPayload,
    pub scan_response: AdvPayload,
}

#[embassy_executor::task]
pub async fn peripheral_task(
    sd: &'static Softdevice,
    server: &'static SensorServer,
    adv: &'static AdvData,
    link_tx: LinkEventSender,
    command_tx: CommandSender,
    led: &'static LedSignal,
) -> ! {
    let config = peripheral::Config {
        interval: ADV_INTERVAL,
        ..Default::default()
    };
    let security = bonder();

    loop {
        led.signal(pattern_for(false, AlertLevel::None));

        let advertisement = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv.adv,
            scan_data: &adv.scan_response,
        };
        info!("Advertising as \"{=str}\"", DEVICE_NAME);
        let conn = match peripheral::advertise_pairable(sd, advertisement, &config, security).await
        {
            Ok(conn) => conn,
            Err(e) => {
                error!("Advertising failed: {:?}", e);
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };

        info!("Connected, bonded peer: {}", security.is_bonded(&conn));
        set_current_link(Some(conn.clone()));
        link_tx.send(LinkEvent::Connected).await;
        led.signal(pattern_for(true, AlertLevel::None));

        let mut alert = AlertLevel::None;
        let _ = gatt_server::run(&conn, server, |event| match event {
            ServerEvent::Link(ev) => {
                if link_tx.try_send(ev).is_err() {
                    warn!("Link event queue full, dropped {}", ev);
                }
            }
            ServerEvent::Command(cmd) => {
                info!("Command: {}", cmd);
                if command_tx.try_send(cmd).is_err() {
                    warn!("Command queue full, dropped {}", cmd);
                }
            }
            ServerEvent::Alert(level) => {
                if level != alert {
                    match level {
                        AlertLevel::None => info!("Alert stopped"),
                        _ => info!("Alert started: {}", level),
                    }
                }
                alert = level;
                led.signal(pattern_for(true, level));
            }
        })
        .await;

        info!("Disconnected");
        set_current_link(None);
        server.on_disconnect();
        // An unconfirmed indication dies with the link.
        link_tx.send(LinkEvent::IndicateFailed).await;
        link_tx.send(LinkEvent::Disconnected).await;
    }
}
