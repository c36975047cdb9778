//! Application-wide constants and compile-time configuration.
//!
//! Pin assignments, timing parameters, UUIDs and the analog channel table
//! live here so they can be tuned in one place.

use crate::sensor::{AnalogInput, ChannelConfig, Gain, Reference, Resolution};

// BLE identity

/// GAP device name, also sent as the complete local name in the scan response.
pub const DEVICE_NAME: &str = "SafeDC ADC";

/// Vendor primary service.
pub const VENDOR_SERVICE_UUID: u128 = 0xDE495ED4_C63C_E850_4B9B_AF8F1053D8D6;

/// Reading text: read, notify, indicate.
pub const DATA_CHAR_UUID: u128 = 0x6E400002_B5A3_F393_E0A9_E50E24DCCA9E;

/// Peer commands: write, write without response.
pub const COMMAND_CHAR_UUID: u128 = 0x6E400003_B5A3_F393_E0A9_E50E24DCCA9E;

/// Long value reassembled from prepared writes.
pub const LONG_CHAR_UUID: u128 = 0x12345678_1234_5678_1234_56789ABCDEF3;

/// Fixed 4-byte signed value.
pub const SIGNED_CHAR_UUID: u128 = 0x13345678_1234_5678_1334_56789ABCDEF3;

/// Accepts write commands only.
pub const WRITE_CMD_CHAR_UUID: u128 = 0x12345678_1234_5678_1234_56789ABCDEF4;

pub const BATTERY_SERVICE_UUID16: u16 = 0x180F;
pub const BATTERY_LEVEL_UUID16: u16 = 0x2A19;
pub const IMMEDIATE_ALERT_SERVICE_UUID16: u16 = 0x1802;
pub const ALERT_LEVEL_UUID16: u16 = 0x2A06;

/// Standard services listed in the advertising payload.
pub const ADVERTISED_SERVICES_16: [u16; 2] =
    [BATTERY_SERVICE_UUID16, IMMEDIATE_ALERT_SERVICE_UUID16];

/// Advertising interval (0.625 ms units).
#[cfg(debug_assertions)]
pub const ADV_INTERVAL: u32 = 400; // 250 ms
#[cfg(not(debug_assertions))]
pub const ADV_INTERVAL: u32 = 1600; // 1 s

/// ATT MTU requested from the SoftDevice. Large enough to write the long
/// characteristic in one request once the central negotiates it.
pub const ATT_MTU: u16 = 80;

/// Maximum number of bonds held in RAM.
pub const MAX_BONDS: usize = 4;

// GATT value capacities

/// Capacity of the data, command and write-command characteristics.
pub const VND_MAX_LEN: usize = 20;

/// Capacity of the long characteristic.
pub const VND_LONG_MAX_LEN: usize = 74;

/// Maximum queued prepare-write segments for the long characteristic.
pub const PREPARE_QUEUE_DEPTH: usize = 8;

/// Initial contents of the data and command characteristics.
pub const VND_INITIAL_VALUE: &[u8] = b"0000 0000 0000 0001";
pub const VND_WWR_INITIAL_VALUE: &[u8] = b"0000 0000 0000 0003";
pub const VND_LONG_INITIAL_VALUE: &[u8] =
    b"Vendor data1Vendor data2Vendor data3Vendor data4Vendor data5Vendor data6. ";

// Sampling

/// Period of the sample → format → notify cycle (ms).
pub const SAMPLE_INTERVAL_MS: u64 = 1000;

/// Upper bound on one SAADC conversion round before the cycle gives up
/// on fresh values (ms).
pub const SAMPLE_TIMEOUT_MS: u64 = 50;

/// Number of sensing channels formatted into each reading.
pub const CHANNEL_COUNT: usize = 4;

pub const ADC_RESOLUTION: Resolution = Resolution::Bits12;

/// Sensing channels, in notification field order.
///
/// AIN4..AIN7 are P0.28..P0.31 on the nRF52840.
pub const ADC_CHANNELS: [ChannelConfig; CHANNEL_COUNT] = [
    ChannelConfig::single_ended(AnalogInput::Ain(4), Gain::Gain1_6, Reference::Internal),
    ChannelConfig::single_ended(AnalogInput::Ain(5), Gain::Gain1_6, Reference::Internal),
    ChannelConfig::single_ended(AnalogInput::Ain(6), Gain::Gain1_6, Reference::Internal),
    ChannelConfig::single_ended(AnalogInput::Ain(7), Gain::Gain1_6, Reference::Internal),
];

/// Supply monitor channel (SAADC VDD input) feeding the Battery Service.
pub const VDD_CHANNEL: ChannelConfig =
    ChannelConfig::single_ended(AnalogInput::Vdd, Gain::Gain1_6, Reference::Internal);

/// Battery voltage mapped to 0 % and 100 % (mV).
pub const BATTERY_EMPTY_MV: i32 = 2000;
pub const BATTERY_FULL_MV: i32 = 3000;

// DigiPot current source

/// Sense resistor between the wiper-driven source and ground (Ω).
pub const DIGIPOT_RSENSE_OHM: u32 = 10_000;

/// Wiper voltage at full-scale code (mV).
pub const DIGIPOT_FULL_SCALE_MV: u32 = 1200;

/// Number of wiper steps.
pub const DIGIPOT_STEPS: u32 = 256;

/// Stimulation current programmed when flash holds no setpoint (µA).
pub const DIGIPOT_DEFAULT_CURRENT_UA: u32 = 50;

/// DigiPot SPI clock.
pub const DIGIPOT_SPI_FREQUENCY_HZ: u32 = 1_000_000;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; the concrete `embassy_nrf::peripherals::*`
// are picked in `main.rs`. Adjust for your custom PCB.
//
//   Status LED (active-low)  → P0.14
//   DigiPot CS (active-high) → P0.22
//   DigiPot MOSI             → P0.23
//   DigiPot SCK              → P0.19
//   Analog inputs            → P0.28..P0.31 (AIN4..AIN7)

// Status LED

/// Blink timings while advertising (ms).
pub const LED_ADVERTISING_ON_MS: u64 = 50;
pub const LED_ADVERTISING_OFF_MS: u64 = 50;

/// Blink timings during an Immediate Alert (ms).
pub const LED_MILD_ALERT_ON_MS: u64 = 500;
pub const LED_MILD_ALERT_OFF_MS: u64 = 500;
pub const LED_HIGH_ALERT_ON_MS: u64 = 100;
pub const LED_HIGH_ALERT_OFF_MS: u64 = 100;

// Settings storage

/// Flash page index where settings storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for settings.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 2;
