//! SPI digital potentiometer that sets the sense current.
//!
//! The wiper drives a source across `DIGIPOT_RSENSE_OHM`, so a target
//! current maps to a wiper voltage and then to one of 256 codes spanning
//! `DIGIPOT_FULL_SCALE_MV`.

#[cfg(feature = "embedded")]
pub mod driver;

use crate::command::Command;
use crate::config::{DIGIPOT_FULL_SCALE_MV, DIGIPOT_RSENSE_OHM, DIGIPOT_STEPS};

/// Wiper code for a sense current in µA, rounded, clamped to 0..=255.
///
/// `code = I · R / 10⁶ · 256 / 1.2 V`; 50 µA across 10 kΩ gives 107.
pub fn wiper_code(microamps: u32) -> u8 {
    // µA · Ω = µV. Work in µV against a µV full scale to stay integral.
    let numerator = u64::from(microamps) * u64::from(DIGIPOT_RSENSE_OHM) * u64::from(DIGIPOT_STEPS);
    let denominator = u64::from(DIGIPOT_FULL_SCALE_MV) * 1000;
    let code = (numerator + denominator / 2) / denominator;
    code.min(u64::from(u8::MAX)) as u8
}

/// Persisted DigiPot setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Setpoint {
    Current { microamps: u32 },
    Wiper { code: u8 },
}

const TAG_CURRENT: u8 = 1;
const TAG_WIPER: u8 = 2;

/// Serialized setpoint size: `[tag][u32 LE]`.
pub const SETPOINT_LEN: usize = 5;

impl Setpoint {
    pub fn from_command(cmd: Command) -> Option<Self> {
        match cmd {
            Command::SetCurrent { microamps } => Some(Setpoint::Current { microamps }),
            Command::SetWiper { code } => Some(Setpoint::Wiper { code }),
            Command::Text => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Setpoint::Current { microamps } => wiper_code(microamps),
            Setpoint::Wiper { code } => code,
        }
    }

    pub fn to_bytes(self) -> [u8; SETPOINT_LEN] {
        let (tag, value) = match self {
            Setpoint::Current { microamps } => (TAG_CURRENT, microamps),
            Setpoint::Wiper { code } => (TAG_WIPER, u32::from(code)),
        };
        let v = value.to_le_bytes();
        [tag, v[0], v[1], v[2], v[3]]
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let [tag, a, b, c, d] = *data else {
            return None;
        };
        let value = u32::from_le_bytes([a, b, c, d]);
        match tag {
            TAG_CURRENT => Some(Setpoint::Current { microamps: value }),
            TAG_WIPER => u8::try_from(value).ok().map(|code| Setpoint::Wiper { code }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_current_gives_107() {
        assert_eq!(wiper_code(50), 107);
    }

    #[test]
    fn code_scales_and_clamps() {
        assert_eq!(wiper_code(0), 0);
        // 120 µA · 10 kΩ = 1.2 V = full scale.
        assert_eq!(wiper_code(117), 250);
        assert_eq!(wiper_code(120), 255);
        assert_eq!(wiper_code(1_000_000), 255);
    }

    #[test]
    fn setpoint_from_command() {
        assert_eq!(
            Setpoint::from_command(Command::SetCurrent { microamps: 50 }),
            Some(Setpoint::Current { microamps: 50 })
        );
        assert_eq!(Setpoint::from_command(Command::Text), None);
        assert_eq!(Setpoint::Wiper { code: 9 }.code(), 9);
        assert_eq!(Setpoint::Current { microamps: 50 }.code(), 107);
    }

    #[test]
    fn setpoint_bytes_decode() {
        assert_eq!(
            Setpoint::from_bytes(&Setpoint::Current { microamps: 75 }.to_bytes()),
            Some(Setpoint::Current { microamps: 75 })
        );
        assert_eq!(
            Setpoint::from_bytes(&[TAG_WIPER, 200, 0, 0, 0]),
            Some(Setpoint::Wiper { code: 200 })
        );
    }

    #[test]
    fn corrupt_setpoint_is_rejected() {
        assert_eq!(Setpoint::from_bytes(&[]), None);
        assert_eq!(Setpoint::from_bytes(&[9, 0, 0, 0, 0]), None);
        assert_eq!(Setpoint::from_bytes(&[TAG_WIPER, 0, 1, 0, 0]), None);
        assert_eq!(Setpoint::from_bytes(&[TAG_CURRENT, 1, 0, 0]), None);
    }
}
