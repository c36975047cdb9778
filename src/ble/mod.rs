//! Bluetooth Low Energy subsystem.
//!
//! The device runs the Nordic SoftDevice S140 in **Peripheral** role:
//!
//! 1. **Advertising** - connectable, scannable advertising with the hosted
//!    service UUIDs; the name goes in the scan response.
//! 2. **GATT server** - vendor service (reading text, command, long, signed
//!    and write-command characteristics), Battery Service and Immediate
//!    Alert Service.
//! 3. **Notifier** - pushes each reading frame to a subscribed central,
//!    with at most one indication in flight.
//!
//! Stack callbacks become [`LinkEvent`]s and reach the control task through
//! an Embassy channel. Everything outside the `embedded` feature is plain
//! logic and runs in host tests.

pub mod advertising;
pub mod alert;
pub mod attribute;
pub mod notifier;
pub mod vendor;

#[cfg(feature = "embedded")]
pub mod bonder;
#[cfg(feature = "embedded")]
pub mod gatt_server;
#[cfg(feature = "embedded")]
pub mod peripheral;

/// Characteristic whose CCCD the peer wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotifyTarget {
    /// Vendor reading text.
    Data,
    /// Battery Level.
    Battery,
}

/// Link-level events the control task reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    Connected,
    Disconnected,
    SubscriptionChanged {
        target: NotifyTarget,
        notify: bool,
        indicate: bool,
    },
    /// Peer confirmed the outstanding indication.
    IndicateAcked,
    /// Outstanding indication was dropped without confirmation.
    IndicateFailed,
}

impl LinkEvent {
    /// Decode a CCCD write (bit 0 notify, bit 1 indicate).
    pub fn from_cccd(target: NotifyTarget, data: &[u8]) -> Option<Self> {
        let flags = *data.first()?;
        Some(LinkEvent::SubscriptionChanged {
            target,
            notify: flags & 0x01 != 0,
            indicate: flags & 0x02 != 0,
        })
    }
}

/// 128-bit UUID in the little-endian byte order used on air and by the
/// SoftDevice.
pub const fn uuid128_le(uuid: u128) -> [u8; 16] {
    uuid.to_le_bytes()
}

#[cfg(feature = "embedded")]
pub use embedded::*;

#[cfg(feature = "embedded")]
mod embedded {
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use embassy_sync::channel::{Channel, Receiver, Sender};
    use nrf_softdevice::{raw, Softdevice};

    use super::LinkEvent;
    use crate::command::Command;
    use crate::config::{ATT_MTU, DEVICE_NAME};

    pub const LINK_EVENT_QUEUE: usize = 8;
    pub const COMMAND_QUEUE: usize = 4;

    pub type LinkEventChannel = Channel<CriticalSectionRawMutex, LinkEvent, LINK_EVENT_QUEUE>;
    pub type LinkEventSender = Sender<'static, CriticalSectionRawMutex, LinkEvent, LINK_EVENT_QUEUE>;
    pub type LinkEventReceiver =
        Receiver<'static, CriticalSectionRawMutex, LinkEvent, LINK_EVENT_QUEUE>;

    pub type CommandChannel = Channel<CriticalSectionRawMutex, Command, COMMAND_QUEUE>;
    pub type CommandSender = Sender<'static, CriticalSectionRawMutex, Command, COMMAND_QUEUE>;
    pub type CommandReceiver = Receiver<'static, CriticalSectionRawMutex, Command, COMMAND_QUEUE>;

    fn softdevice_config() -> nrf_softdevice::Config {
        let name_len = DEVICE_NAME.len() as u16;
        nrf_softdevice::Config {
            clock: Some(raw::nrf_clock_lf_cfg_t {
                source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
                rc_ctiv: 0,
                rc_temp_ctiv: 0,
                accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
            }),
            conn_gap: Some(raw::ble_gap_conn_cfg_t {
                conn_count: 1,
                event_length: raw::BLE_GAP_EVENT_LENGTH_DEFAULT as u16,
            }),
            conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: ATT_MTU }),
            gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
                attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
            }),
            gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
                adv_set_count: 1,
                periph_role_count: 1,
                central_role_count: 0,
                central_sec_count: 0,
                _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
            }),
            gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
                p_value: DEVICE_NAME.as_ptr() as *const u8 as _,
                current_len: name_len,
                max_len: name_len,
                write_perm: unsafe { core::mem::zeroed() },
                _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                    raw::BLE_GATTS_VLOC_STACK as u8,
                ),
            }),
            ..Default::default()
        }
    }

    /// Enable the SoftDevice.
    ///
    /// The returned reference must be handed to `softdevice_task` before
    /// anything waits on a BLE operation.
    pub fn enable_softdevice() -> &'static mut Softdevice {
        Softdevice::enable(&softdevice_config())
    }

    #[embassy_executor::task]
    pub async fn softdevice_task(sd: &'static Softdevice) -> ! {
        sd.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cccd_bits_decode() {
        assert_eq!(
            LinkEvent::from_cccd(NotifyTarget::Data, &[0x03, 0x00]),
            Some(LinkEvent::SubscriptionChanged {
                target: NotifyTarget::Data,
                notify: true,
                indicate: true,
            })
        );
        assert_eq!(
            LinkEvent::from_cccd(NotifyTarget::Battery, &[0x02, 0x00]),
            Some(LinkEvent::SubscriptionChanged {
                target: NotifyTarget::Battery,
                notify: false,
                indicate: true,
            })
        );
        assert_eq!(LinkEvent::from_cccd(NotifyTarget::Data, &[]), None);
    }

    #[test]
    fn uuid128_bytes_are_reversed() {
        let le = uuid128_le(0x00112233_4455_6677_8899_AABBCCDDEEFF);
        assert_eq!(le[0], 0xFF);
        assert_eq!(le[15], 0x00);
    }
}
