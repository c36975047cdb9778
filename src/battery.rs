//! Battery Service level derived from the VDD channel.

use crate::config::{BATTERY_EMPTY_MV, BATTERY_FULL_MV};

/// Linear map of supply voltage to 0..=100 %, clamped.
pub fn level_percent(vdd_mv: i32) -> u8 {
    if vdd_mv <= BATTERY_EMPTY_MV {
        return 0;
    }
    if vdd_mv >= BATTERY_FULL_MV {
        return 100;
    }
    ((vdd_mv - BATTERY_EMPTY_MV) * 100 / (BATTERY_FULL_MV - BATTERY_EMPTY_MV)) as u8
}

/// Tracks the published Battery Level and reports when it changes.
#[derive(Debug, Default)]
pub struct BatteryMonitor {
    level: Option<u8>,
    notify_enabled: bool,
}

/// Result of feeding one VDD sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryUpdate {
    pub level: u8,
    /// Level differs from the last published one.
    pub changed: bool,
    /// Changed and the peer subscribed to Battery Level.
    pub notify: bool,
}

impl BatteryMonitor {
    pub const fn new() -> Self {
        Self {
            level: None,
            notify_enabled: false,
        }
    }

    pub fn level(&self) -> Option<u8> {
        self.level
    }

    pub fn set_notify_enabled(&mut self, enabled: bool) {
        self.notify_enabled = enabled;
    }

    pub fn update(&mut self, vdd_mv: i32) -> BatteryUpdate {
        let level = level_percent(vdd_mv);
        let changed = self.level != Some(level);
        self.level = Some(level);
        BatteryUpdate {
            level,
            changed,
            notify: changed && self.notify_enabled,
        }
    }
}
