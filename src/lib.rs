//! SafeDC analog sensor firmware.
//!
//! Samples a fixed set of SAADC channels once a second, renders the
//! millivolt values as `"%04d %04d %04d %04d"` and pushes that text to a
//! subscribed BLE central.
//!
//! The pure logic (conversion, framing, GATT value rules, notifier state,
//! command parsing) builds for the host and is covered by `cargo test`.
//! The hardware glue (SoftDevice, SAADC, SPI DigiPot, flash, LED) is only
//! compiled with the `embedded` feature and is used by `main.rs`.

#![cfg_attr(not(test), no_std)]

// ═══════════════════════════════════════════════════════════════════════════
// Configuration & errors
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════════════════
// Sampling pipeline
// ═══════════════════════════════════════════════════════════════════════════

pub mod control_loop;
pub mod frame;
pub mod sensor;

// ═══════════════════════════════════════════════════════════════════════════
// BLE
// ═══════════════════════════════════════════════════════════════════════════

pub mod ble;
pub mod command;

// ═══════════════════════════════════════════════════════════════════════════
// Peripherals
// ═══════════════════════════════════════════════════════════════════════════

pub mod battery;
pub mod digipot;
pub mod led_logic;

#[cfg(feature = "embedded")]
pub mod control_task;
#[cfg(feature = "embedded")]
pub mod led;
#[cfg(feature = "embedded")]
pub mod storage;

pub use error::Error;
