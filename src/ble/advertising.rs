//! Advertising and scan-response payloads, plus the AD structure parsers
//! used to check them.
//!
//! Advertising data:
//!   - Flags: LE General Discoverable, BR/EDR not supported
//!   - Complete list of 16-bit service UUIDs (Battery, Immediate Alert)
//!   - Complete list of 128-bit service UUIDs (vendor service)
//!
//! The complete local name goes in the scan response so the advertising
//! packet stays within 31 bytes.

use heapless::{String, Vec};

use crate::config::{ADVERTISED_SERVICES_16, DEVICE_NAME, VENDOR_SERVICE_UUID};
use crate::error::Error;

use super::uuid128_le;

/// Legacy advertising payload limit.
pub const MAX_ADV_LEN: usize = 31;

pub type AdvPayload = Vec<u8, MAX_ADV_LEN>;

// AD types (Bluetooth Assigned Numbers §2.3)
pub const AD_FLAGS: u8 = 0x01;
pub const AD_UUID16_INCOMPLETE: u8 = 0x02;
pub const AD_UUID16_COMPLETE: u8 = 0x03;
pub const AD_UUID128_INCOMPLETE: u8 = 0x06;
pub const AD_UUID128_COMPLETE: u8 = 0x07;
pub const AD_NAME_SHORT: u8 = 0x08;
pub const AD_NAME_COMPLETE: u8 = 0x09;

/// LE General Discoverable | BR/EDR Not Supported.
pub const FLAGS_GENERAL_NO_BREDR: u8 = 0x06;

fn push_field(out: &mut AdvPayload, ad_type: u8, data: &[u8]) -> Result<(), Error> {
    let len = u8::try_from(data.len() + 1).map_err(|_| Error::BufferOverflow)?;
    out.push(len).map_err(|_| Error::BufferOverflow)?;
    out.push(ad_type).map_err(|_| Error::BufferOverflow)?;
    out.extend_from_slice(data).map_err(|_| Error::BufferOverflow)
}

/// Build the advertising packet.
pub fn advertising_data() -> Result<AdvPayload, Error> {
    let mut out = AdvPayload::new();
    push_field(&mut out, AD_FLAGS, &[FLAGS_GENERAL_NO_BREDR])?;

    let mut uuids16: Vec<u8, { 2 * ADVERTISED_SERVICES_16.len() }> = Vec::new();
    for uuid in ADVERTISED_SERVICES_16 {
        uuids16
            .extend_from_slice(&uuid.to_le_bytes())
            .map_err(|_| Error::BufferOverflow)?;
    }
    push_field(&mut out, AD_UUID16_COMPLETE, &uuids16)?;
    push_field(&mut out, AD_UUID128_COMPLETE, &uuid128_le(VENDOR_SERVICE_UUID))?;
    Ok(out)
}

/// Build the scan response packet.
pub fn scan_response_data() -> Result<AdvPayload, Error> {
    let mut out = AdvPayload::new();
    push_field(&mut out, AD_NAME_COMPLETE, DEVICE_NAME.as_bytes())?;
    Ok(out)
}

/// Iterate `(ad_type, data)` over well-formed AD structures.
///
/// Stops at the first zero-length or overrunning structure.
pub fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let field = (data[i + 1], &data[i + 2..i + 1 + len]);
        i += len + 1;
        Some(field)
    })
}

/// Check whether an advertisement lists a 16-bit service UUID.
pub fn contains_uuid16(data: &[u8], uuid: u16) -> bool {
    let le = uuid.to_le_bytes();
    ad_structures(data)
        .filter(|(t, _)| *t == AD_UUID16_INCOMPLETE || *t == AD_UUID16_COMPLETE)
        .any(|(_, d)| d.chunks_exact(2).any(|c| c == le))
}

/// Check whether an advertisement lists a 128-bit service UUID.
pub fn contains_uuid128(data: &[u8], uuid: u128) -> bool {
    let le = uuid128_le(uuid);
    ad_structures(data)
        .filter(|(t, _)| *t == AD_UUID128_INCOMPLETE || *t == AD_UUID128_COMPLETE)
        .any(|(_, d)| d.chunks_exact(16).any(|c| c == le))
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    let mut name = String::new();
    match ad_structures(data).find(|(t, _)| *t == AD_NAME_SHORT || *t == AD_NAME_COMPLETE) {
        Some((_, bytes)) => {
            for &b in bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
        }
        None => {
            let _ = name.push_str("Unknown");
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BATTERY_SERVICE_UUID16, IMMEDIATE_ALERT_SERVICE_UUID16};

    #[test]
    fn advertising_packet_fits_and_has_flags_first() {
        let adv = advertising_data().unwrap();
        assert!(adv.len() <= MAX_ADV_LEN);
        assert_eq!(&adv[..3], &[0x02, AD_FLAGS, FLAGS_GENERAL_NO_BREDR]);
    }

    #[test]
    fn advertising_lists_hosted_services() {
        let adv = advertising_data().unwrap();
        assert!(contains_uuid16(&adv, BATTERY_SERVICE_UUID16));
        assert!(contains_uuid16(&adv, IMMEDIATE_ALERT_SERVICE_UUID16));
        assert!(!contains_uuid16(&adv, 0x180D));
        assert!(contains_uuid128(&adv, VENDOR_SERVICE_UUID));
    }

    #[test]
    fn uuid128_is_little_endian_on_air() {
        let adv = advertising_data().unwrap();
        let (_, uuid) = ad_structures(&adv)
            .find(|(t, _)| *t == AD_UUID128_COMPLETE)
            .unwrap();
        // DE495ED4-C63C-E850-4B9B-AF8F1053D8D6 reversed.
        assert_eq!(uuid[0], 0xD6);
        assert_eq!(uuid[15], 0xDE);
    }

    #[test]
    fn scan_response_carries_name() {
        let sr = scan_response_data().unwrap();
        assert_eq!(extract_device_name(&sr).as_str(), DEVICE_NAME);
        assert_eq!(extract_device_name(&advertising_data().unwrap()).as_str(), "Unknown");
    }

    #[test]
    fn parser_stops_on_malformed_length() {
        let data = [0x02, AD_FLAGS, 0x06, 0x09, AD_NAME_COMPLETE, b'a'];
        let fields: std::vec::Vec<_> = ad_structures(&data).collect();
        assert_eq!(fields.len(), 1);
        assert_eq!(ad_structures(&[0x00, 0x01]).count(), 0);
    }
}
