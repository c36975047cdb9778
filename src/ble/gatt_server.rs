//! Attribute table and write dispatch.
//!
//! Services are registered with the SoftDevice's `ServiceBuilder` so the
//! vendor characteristics can use deferred (authorized) writes: each write
//! is checked by `VendorValues` and accepted or answered with an ATT error
//! before the stack stores it.

use core::cell::RefCell;

use defmt::{debug, info, warn};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{
    self, DeferredWriteReply, IndicateValueError, NotifyValueError, RegisterError, WriteOp,
};
use nrf_softdevice::ble::{Connection, GattError, SecurityMode, Uuid};
use nrf_softdevice::Softdevice;

use super::alert::AlertLevel;
use super::attribute::WriteKind;
use super::notifier::{Transport, TransportError};
use super::vendor::{write_target, VendorChar, VendorValues, WriteEffect, SIGNED_INITIAL};
use super::{uuid128_le, LinkEvent, NotifyTarget};
use crate::command::Command;
use crate::config::{
    ALERT_LEVEL_UUID16, BATTERY_LEVEL_UUID16, BATTERY_SERVICE_UUID16, COMMAND_CHAR_UUID,
    DATA_CHAR_UUID, IMMEDIATE_ALERT_SERVICE_UUID16, LONG_CHAR_UUID, SIGNED_CHAR_UUID,
    VENDOR_SERVICE_UUID, VND_INITIAL_VALUE, VND_LONG_INITIAL_VALUE, VND_LONG_MAX_LEN, VND_MAX_LEN,
    VND_WWR_INITIAL_VALUE, WRITE_CMD_CHAR_UUID,
};
use crate::error::{AttError, BleError, Error};

/// Attribute handles resolved once at registration.
#[derive(Debug, Clone, Copy, defmt::Format)]
pub struct Handles {
    pub data_value: u16,
    pub data_cccd: u16,
    pub command: u16,
    pub long: u16,
    pub signed: u16,
    pub write_command: u16,
    pub battery_level: u16,
    pub battery_cccd: u16,
    pub alert_level: u16,
}

/// What the GATT server hands to the peripheral task.
#[derive(Debug, Clone, Copy, defmt::Format)]
pub enum ServerEvent {
    Link(LinkEvent),
    Command(Command),
    Alert(AlertLevel),
}

pub struct SensorServer {
    handles: Handles,
    vendor: RefCell<VendorValues>,
}

impl From<RegisterError> for Error {
    fn from(_: RegisterError) -> Self {
        Error::GattRegistration
    }
}

fn uuid128(uuid: u128) -> Uuid {
    Uuid::new_128(&uuid128_le(uuid))
}

impl SensorServer {
    /// Register vendor, Battery and Immediate Alert services.
    pub fn register(sd: &mut Softdevice) -> Result<Self, Error> {
        let mut vendor = ServiceBuilder::new(sd, uuid128(VENDOR_SERVICE_UUID))?;

        // Reading text. CCCD writes need an encrypted link.
        let data = vendor
            .add_characteristic(
                uuid128(DATA_CHAR_UUID),
                Attribute::new(VND_INITIAL_VALUE).variable_len(VND_MAX_LEN as u16),
                Metadata::with_security(
                    Properties::new().read().notify().indicate(),
                    SecurityMode::JustWorks,
                ),
            )?
            .build();

        let command = vendor
            .add_characteristic(
                uuid128(COMMAND_CHAR_UUID),
                Attribute::new(VND_INITIAL_VALUE)
                    .variable_len(VND_MAX_LEN as u16)
                    .deferred_write(),
                Metadata::new(Properties::new().read().write().write_without_response()),
            )?
            .build();

        let long = vendor
            .add_characteristic(
                uuid128(LONG_CHAR_UUID),
                Attribute::new(VND_LONG_INITIAL_VALUE)
                    .variable_len(VND_LONG_MAX_LEN as u16)
                    .deferred_write(),
                Metadata::new(Properties::new().read().write()),
            )?
            .build();

        let signed = vendor
            .add_characteristic(
                uuid128(SIGNED_CHAR_UUID),
                Attribute::new(SIGNED_INITIAL.to_le_bytes()).deferred_write(),
                Metadata::new(Properties::new().read().write().signed_write()),
            )?
            .build();

        let write_command = vendor
            .add_characteristic(
                uuid128(WRITE_CMD_CHAR_UUID),
                Attribute::new(VND_WWR_INITIAL_VALUE)
                    .variable_len(VND_MAX_LEN as u16)
                    .deferred_write(),
                Metadata::new(Properties::new().read().write_without_response()),
            )?
            .build();
        let _ = vendor.build();

        let mut bas = ServiceBuilder::new(sd, Uuid::new_16(BATTERY_SERVICE_UUID16))?;
        let battery = bas
            .add_characteristic(
                Uuid::new_16(BATTERY_LEVEL_UUID16),
                Attribute::new([0u8]),
                Metadata::new(Properties::new().read().notify()),
            )?
            .build();
        let _ = bas.build();

        let mut ias = ServiceBuilder::new(sd, Uuid::new_16(IMMEDIATE_ALERT_SERVICE_UUID16))?;
        let alert = ias
            .add_characteristic(
                Uuid::new_16(ALERT_LEVEL_UUID16),
                Attribute::new([0u8]),
                Metadata::new(Properties::new().write_without_response()),
            )?
            .build();
        let _ = ias.build();

        let handles = Handles {
            data_value: data.value_handle,
            data_cccd: data.cccd_handle,
            command: command.value_handle,
            long: long.value_handle,
            signed: signed.value_handle,
            write_command: write_command.value_handle,
            battery_level: battery.value_handle,
            battery_cccd: battery.cccd_handle,
            alert_level: alert.value_handle,
        };
        debug!("GATT handles: {}", handles);

        Ok(Self {
            handles,
            vendor: RefCell::new(VendorValues::new()),
        })
    }

    pub fn handles(&self) -> Handles {
        self.handles
    }

    /// Drop half-finished prepared writes when the link goes away.
    pub fn on_disconnect(&self) {
        self.vendor.borrow_mut().reset_prepared();
    }

    fn vendor_target(&self, handle: u16) -> Option<VendorChar> {
        let h = &self.handles;
        match handle {
            _ if handle == h.data_value => Some(VendorChar::Data),
            _ if handle == h.command => Some(VendorChar::Command),
            _ if handle == h.long => Some(VendorChar::Long),
            _ if handle == h.signed => Some(VendorChar::Signed),
            _ if handle == h.write_command => Some(VendorChar::WriteCommand),
            _ => None,
        }
    }
}

fn reject(reply: DeferredWriteReply, e: AttError) {
    if reply.reply(Err(GattError::from_att_error(e.code()))).is_err() {
        warn!("Rejection {} not delivered", e);
    }
}

impl gatt_server::Server for SensorServer {
    type Event = ServerEvent;

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        let h = &self.handles;
        if handle == h.data_cccd {
            return LinkEvent::from_cccd(NotifyTarget::Data, data).map(ServerEvent::Link);
        }
        if handle == h.battery_cccd {
            return LinkEvent::from_cccd(NotifyTarget::Battery, data).map(ServerEvent::Link);
        }
        if handle == h.alert_level {
            return match AlertLevel::from_write(data) {
                Some(level) => Some(ServerEvent::Alert(level)),
                None => {
                    warn!("Ignoring alert level write {=[u8]:x}", data);
                    None
                }
            };
        }
        None
    }

    fn on_deferred_write(
        &self,
        handle: u16,
        op: WriteOp,
        offset: usize,
        data: &[u8],
        reply: DeferredWriteReply,
    ) -> Option<Self::Event> {
        // Each prepare is authorized on its own, then the execute once.
        let Some(kind) = WriteKind::from_op_code(op as u8) else {
            reject(reply, AttError::WriteNotPermitted);
            return None;
        };
        let Some(target) = write_target(self.vendor_target(handle), kind) else {
            reject(reply, AttError::WriteNotPermitted);
            return None;
        };

        let result = self.vendor.borrow_mut().on_write(target, kind, offset, data);
        match result {
            Ok(effect) => {
                let stored = match effect {
                    // The stack keeps its own copy of a queued segment.
                    WriteEffect::Stored | WriteEffect::Command(_) | WriteEffect::Queued => {
                        Some(data)
                    }
                    WriteEffect::Executed | WriteEffect::Cancelled => None,
                };
                if reply.reply(Ok(stored)).is_err() {
                    warn!("Write reply for {} not delivered", target);
                }
                debug!("{} write accepted: {}", target, effect);
                match effect {
                    WriteEffect::Command(cmd) => Some(ServerEvent::Command(cmd)),
                    _ => None,
                }
            }
            Err(e) => {
                warn!("{} write rejected: {} (offset {}, len {})", target, e, offset, data.len());
                reject(reply, e);
                None
            }
        }
    }

    fn on_indicate_confirm(&self, _conn: &Connection, handle: u16) -> Option<Self::Event> {
        if handle == self.handles.data_value {
            info!("Indication success");
            Some(ServerEvent::Link(LinkEvent::IndicateAcked))
        } else {
            None
        }
    }
}

/// Data characteristic of one connection.
pub struct GattTransport<'a> {
    conn: &'a Connection,
    handle: u16,
}

impl<'a> GattTransport<'a> {
    pub fn new(conn: &'a Connection, handle: u16) -> Self {
        Self { conn, handle }
    }
}

impl From<NotifyValueError> for TransportError {
    fn from(e: NotifyValueError) -> Self {
        match e {
            NotifyValueError::Disconnected => TransportError::Disconnected,
            NotifyValueError::Raw(raw) => TransportError::Raw(raw as u32),
        }
    }
}

impl From<IndicateValueError> for TransportError {
    fn from(e: IndicateValueError) -> Self {
        match e {
            IndicateValueError::Disconnected => TransportError::Disconnected,
            IndicateValueError::Raw(raw) => TransportError::Raw(raw as u32),
        }
    }
}

impl Transport for GattTransport<'_> {
    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        gatt_server::notify_value(self.conn, self.handle, payload).map_err(Into::into)
    }

    fn indicate(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        gatt_server::indicate_value(self.conn, self.handle, payload).map_err(Into::into)
    }
}

/// Update a local attribute value so reads return it.
pub fn set_value(sd: &Softdevice, handle: u16, value: &[u8]) -> Result<(), Error> {
    gatt_server::set_value(sd, handle, value).map_err(|_| Error::Ble(BleError::SetValueFailed))
}
