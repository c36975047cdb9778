//! Periodic sampling task.
//!
//! Ticks every `SAMPLE_INTERVAL_MS` whether or not a central is connected.
//! Link events are applied between ticks so subscription changes take
//! effect on the next frame.

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};
use nrf_softdevice::ble::gatt_server;
use nrf_softdevice::Softdevice;

use crate::battery::BatteryMonitor;
use crate::ble::gatt_server::{set_value, GattTransport, Handles};
use crate::ble::notifier::Delivery;
use crate::ble::peripheral::current_link;
use crate::ble::{LinkEvent, LinkEventReceiver, NotifyTarget};
use crate::config::{ADC_CHANNELS, ADC_RESOLUTION, CHANNEL_COUNT, SAMPLE_INTERVAL_MS, VDD_CHANNEL};
use crate::control_loop::{ControlLoop, CycleReport};
use crate::sensor::saadc::SensorAdc;
use crate::sensor::{raw_to_millivolts, ChannelReading, ReadError};

#[embassy_executor::task]
pub async fn control_task(
    sd: &'static Softdevice,
    handles: Handles,
    mut adc: SensorAdc,
    link_rx: LinkEventReceiver,
) -> ! {
    let mut control = ControlLoop::new(&ADC_CHANNELS, ADC_RESOLUTION);
    let mut battery = BatteryMonitor::new();
    let mut ticker = Ticker::every(Duration::from_millis(SAMPLE_INTERVAL_MS));

    info!("Sampling {} channels every {} ms", CHANNEL_COUNT, SAMPLE_INTERVAL_MS);

    loop {
        match select(ticker.next(), link_rx.receive()).await {
            Either::First(()) => {
                control.start_sampling();
                let scan = adc.scan().await;

                let report = match current_link() {
                    Some(conn) => {
                        let mut transport = GattTransport::new(&conn, handles.data_value);
                        control.finish_cycle(scan.channels, Some(&mut transport))
                    }
                    None => control.finish_cycle::<GattTransport<'static>>(scan.channels, None),
                };
                log_cycle(&report);

                if let Err(e) = set_value(sd, handles.data_value, report.frame.as_bytes()) {
                    warn!("Reading not stored for reads: {}", e);
                }

                update_battery(sd, &handles, &mut battery, scan.vdd);
            }
            Either::Second(event) => {
                debug!("Link event: {}", event);
                if let LinkEvent::SubscriptionChanged {
                    target: NotifyTarget::Battery,
                    notify,
                    ..
                } = event
                {
                    battery.set_notify_enabled(notify);
                }
                if event == LinkEvent::Disconnected {
                    battery.set_notify_enabled(false);
                }
                control.on_link_event(&event);
            }
        }
    }
}

fn log_cycle(report: &CycleReport<CHANNEL_COUNT>) {
    for (i, reading) in report.samples.readings.iter().enumerate() {
        match reading {
            ChannelReading::Fresh { raw, mv } => debug!("ch{}: raw {} = {} mV", i, raw, mv),
            ChannelReading::Unconverted { raw } => {
                warn!("ch{}: raw {}, value in mV not available", i, raw)
            }
            ChannelReading::ReadFailed(e) => warn!("ch{}: read failed: {}", i, e),
        }
    }

    if report.frame.is_truncated() {
        warn!("Reading text cut to {} bytes", report.frame.len());
    }
    info!("#{} {=str}", report.cycle, report.frame.as_str());

    match report.outcome.notification {
        Delivery::Failed(e) => warn!("Notification failed: {}", e),
        Delivery::Sent => debug!("Notification sent"),
        _ => {}
    }
    match report.outcome.indication {
        Delivery::Failed(e) => warn!("Indication failed: {}", e),
        Delivery::Pending => debug!("Indication still pending, skipped"),
        Delivery::Sent => debug!("Indication sent"),
        Delivery::Skipped => {}
    }
}

fn update_battery(
    sd: &Softdevice,
    handles: &Handles,
    battery: &mut BatteryMonitor,
    vdd: Result<i16, ReadError>,
) {
    let raw = match vdd {
        Ok(raw) => raw,
        Err(e) => {
            warn!("VDD read failed: {}", e);
            return;
        }
    };
    let Some(mv) = raw_to_millivolts(raw, &VDD_CHANNEL, ADC_RESOLUTION) else {
        return;
    };

    let update = battery.update(mv);
    if !update.changed {
        return;
    }
    info!("Battery: {} mV, {}%", mv, update.level);
    if let Err(e) = set_value(sd, handles.battery_level, &[update.level]) {
        warn!("Battery level not stored: {}", e);
    }
    if update.notify {
        if let Some(conn) = current_link() {
            if let Err(e) = gatt_server::notify_value(&conn, handles.battery_level, &[update.level])
            {
                warn!("Battery notification failed: {:?}", e);
            }
        }
    }
}
