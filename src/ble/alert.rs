//! Immediate Alert Service alert level.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlertLevel {
    #[default]
    None,
    Mild,
    High,
}

impl AlertLevel {
    /// Decode the Alert Level characteristic byte. Values above 2 are
    /// reserved.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(AlertLevel::None),
            1 => Some(AlertLevel::Mild),
            2 => Some(AlertLevel::High),
            _ => None,
        }
    }

    /// Decode a full characteristic write, which must be exactly one byte.
    pub fn from_write(data: &[u8]) -> Option<Self> {
        match data {
            [b] => Self::from_byte(*b),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self != AlertLevel::None
    }
}
