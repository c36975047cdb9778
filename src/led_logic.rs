use crate::ble::alert::AlertLevel;
use crate::config::{
    LED_ADVERTISING_OFF_MS, LED_ADVERTISING_ON_MS, LED_HIGH_ALERT_OFF_MS, LED_HIGH_ALERT_ON_MS,
    LED_MILD_ALERT_OFF_MS, LED_MILD_ALERT_ON_MS,
};

/// Status LED behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedPattern {
    Solid,
    Blink { on_ms: u64, off_ms: u64 },
}

/// Pick the LED pattern. An active alert wins over link state.
pub fn pattern_for(connected: bool, alert: AlertLevel) -> LedPattern {
    match alert {
        AlertLevel::High => LedPattern::Blink {
            on_ms: LED_HIGH_ALERT_ON_MS,
            off_ms: LED_HIGH_ALERT_OFF_MS,
        },
        AlertLevel::Mild => LedPattern::Blink {
            on_ms: LED_MILD_ALERT_ON_MS,
            off_ms: LED_MILD_ALERT_OFF_MS,
        },
        AlertLevel::None if connected => LedPattern::Solid,
        AlertLevel::None => LedPattern::Blink {
            on_ms: LED_ADVERTISING_ON_MS,
            off_ms: LED_ADVERTISING_OFF_MS,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertising_blinks_fast_and_short() {
        assert_eq!(
            pattern_for(false, AlertLevel::None),
            LedPattern::Blink {
                on_ms: 50,
                off_ms: 50
            }
        );
    }

    #[test]
    fn connected_is_solid() {
        assert_eq!(pattern_for(true, AlertLevel::None), LedPattern::Solid);
    }

    #[test]
    fn alert_overrides_link_state() {
        let high = pattern_for(true, AlertLevel::High);
        let mild = pattern_for(false, AlertLevel::Mild);
        assert_eq!(
            high,
            LedPattern::Blink {
                on_ms: LED_HIGH_ALERT_ON_MS,
                off_ms: LED_HIGH_ALERT_OFF_MS
            }
        );
        assert_eq!(
            mild,
            LedPattern::Blink {
                on_ms: LED_MILD_ALERT_ON_MS,
                off_ms: LED_MILD_ALERT_OFF_MS
            }
        );
    }
}
