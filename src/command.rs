//! Text commands written by the central to the command characteristic.
//!
//! | Text          | Meaning                                 |
//! |---------------|-----------------------------------------|
//! | `I<microamps>`| program the DigiPot for a sense current |
//! | `P<code>`     | program a raw wiper code (0..=255)      |
//! | anything else | stored and logged only                  |

/// Parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    SetCurrent { microamps: u32 },
    SetWiper { code: u8 },
    /// Not a recognised command.
    Text,
}

impl Command {
    pub fn parse(data: &[u8]) -> Self {
        let Ok(text) = core::str::from_utf8(data) else {
            return Command::Text;
        };
        // Centrals often append a line ending; trailing NULs come from
        // fixed-size client buffers.
        let text = text.trim_end_matches(['\r', '\n', '\0']).trim();

        let mut chars = text.chars();
        let Some(tag) = chars.next() else {
            return Command::Text;
        };
        let arg = chars.as_str().trim();

        match tag {
            'I' | 'i' => arg
                .parse::<u32>()
                .map(|microamps| Command::SetCurrent { microamps })
                .unwrap_or(Command::Text),
            'P' | 'p' => arg
                .parse::<u8>()
                .map(|code| Command::SetWiper { code })
                .unwrap_or(Command::Text),
            _ => Command::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_setpoint() {
        assert_eq!(Command::parse(b"I50"), Command::SetCurrent { microamps: 50 });
        assert_eq!(Command::parse(b"i 120\r\n"), Command::SetCurrent { microamps: 120 });
    }

    #[test]
    fn parses_wiper_code() {
        assert_eq!(Command::parse(b"P107"), Command::SetWiper { code: 107 });
        assert_eq!(Command::parse(b"p0\0\0"), Command::SetWiper { code: 0 });
    }

    #[test]
    fn out_of_range_wiper_is_plain_text() {
        assert_eq!(Command::parse(b"P256"), Command::Text);
    }

    #[test]
    fn other_text_is_not_a_command() {
        assert_eq!(Command::parse(b"0000 0000 0000 0003"), Command::Text);
        assert_eq!(Command::parse(b"Ixyz"), Command::Text);
        assert_eq!(Command::parse(b""), Command::Text);
        assert_eq!(Command::parse(&[0xFF, 0xFE]), Command::Text);
    }
}
