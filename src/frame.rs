//! Fixed-width text rendering of a reading snapshot.
//!
//! Each millivolt value becomes a `%04d` field (sign counts toward the
//! width, so `-5` renders as `-005`) and fields are joined by one space.
//! Four values inside `-999..=9999` give exactly 19 bytes.

use core::fmt::{self, Write};

use heapless::String;

use crate::config::VND_MAX_LEN;
use crate::sensor::Snapshot;

/// Formatted snapshot, never longer than the data characteristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingFrame {
    text: String<VND_MAX_LEN>,
    truncated: bool,
}

impl ReadingFrame {
    /// Render a snapshot.
    ///
    /// Values wider than four characters widen their field. If the text
    /// would then exceed the frame capacity it is cut at the capacity and
    /// the frame is marked truncated.
    pub fn format<const N: usize>(snapshot: &Snapshot<N>) -> Self {
        let mut out = Bounded {
            text: String::new(),
            truncated: false,
        };

        for (i, mv) in snapshot.values().iter().enumerate() {
            let sep = if i == 0 { "" } else { " " };
            // Bounded never returns an error; overflow only sets the flag.
            let _ = write!(out, "{sep}{mv:04}");
        }

        Self {
            text: out.text,
            truncated: out.truncated,
        }
    }

    pub fn as_str(&self) -> &str {
        self.text.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True when the rendered text did not fit and was cut short.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadingFrame {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "\"{=str}\"", self.as_str());
        if self.truncated {
            defmt::write!(f, " (truncated)");
        }
    }
}

struct Bounded {
    text: String<VND_MAX_LEN>,
    truncated: bool,
}

impl Write for Bounded {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.text.push(c).is_err() {
                self.truncated = true;
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: [i32; 4]) -> ReadingFrame {
        ReadingFrame::format(&Snapshot::new(values))
    }

    #[test]
    fn zero_padded_four_digit_fields() {
        let f = frame([293, 733, 1200, 0]);
        assert_eq!(f.as_str(), "0293 0733 1200 0000");
        assert_eq!(f.len(), 19);
        assert!(!f.is_truncated());
    }

    #[test]
    fn negative_values_count_sign_in_width() {
        assert_eq!(frame([-5, -42, -999, 7]).as_str(), "-005 -042 -999 0007");
    }

    #[test]
    fn in_range_values_always_give_same_length() {
        for values in [
            [0, 0, 0, 0],
            [9999, 9999, 9999, 9999],
            [-999, -999, -999, -999],
            [1, -1, 10, -10],
            [3599, 1800, 900, 0],
        ] {
            assert_eq!(frame(values).len(), 19, "{values:?}");
        }
    }

    #[test]
    fn one_wide_field_fills_capacity_exactly() {
        let f = frame([293, 733, 12000, 0]);
        assert_eq!(f.as_str(), "0293 0733 12000 0000");
        assert_eq!(f.len(), VND_MAX_LEN);
        assert!(!f.is_truncated());
    }

    #[test]
    fn overflow_truncates_and_flags() {
        let f = frame([12000, 12000, 12000, -12000]);
        assert_eq!(f.len(), VND_MAX_LEN);
        assert_eq!(f.as_str(), "12000 12000 12000 -1");
        assert!(f.is_truncated());
    }

    #[test]
    fn formatting_is_idempotent() {
        let snap = Snapshot::new([1, 22, 333, 4444]);
        let a = ReadingFrame::format(&snap);
        let b = ReadingFrame::format(&snap);
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), b"0001 0022 0333 4444");
    }

    #[test]
    fn field_count_follows_channel_count() {
        let two = ReadingFrame::format(&Snapshot::new([5, 6]));
        assert_eq!(two.as_str(), "0005 0006");
        let one = ReadingFrame::format(&Snapshot::new([-1]));
        assert_eq!(one.as_str(), "-001");
        let none = ReadingFrame::format(&Snapshot::<0>::new([]));
        assert!(none.is_empty());
    }
}
