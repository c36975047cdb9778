//! SAADC channel descriptors and the raw → millivolt transfer function.
//!
//! The nRF52840 SAADC reports
//!
//! ```text
//! RESULT = (V(P) - V(N)) * GAIN / REFERENCE * 2^(RESOLUTION - m)
//! ```
//!
//! where `m` is 0 for single-ended and 1 for differential inputs. We invert
//! that with integer arithmetic only.

/// Internal reference voltage (mV).
pub const INTERNAL_REFERENCE_MV: i32 = 600;

/// Analog input routed to the SAADC positive terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogInput {
    /// AIN0..AIN7.
    Ain(u8),
    /// Internal VDD sense.
    Vdd,
}

/// Programmable gain stage. Stored as the fraction `num / den`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    Gain1_6,
    Gain1_5,
    Gain1_4,
    Gain1_3,
    Gain1_2,
    Gain1,
    Gain2,
    Gain4,
}

impl Gain {
    /// Gain as `(numerator, denominator)`.
    pub const fn ratio(self) -> (i32, i32) {
        match self {
            Gain::Gain1_6 => (1, 6),
            Gain::Gain1_5 => (1, 5),
            Gain::Gain1_4 => (1, 4),
            Gain::Gain1_3 => (1, 3),
            Gain::Gain1_2 => (1, 2),
            Gain::Gain1 => (1, 1),
            Gain::Gain2 => (2, 1),
            Gain::Gain4 => (4, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reference {
    /// 0.6 V bandgap.
    Internal,
    /// VDD / 4. Depends on the unregulated supply, so no fixed mV scale.
    VddDiv4,
}

impl Reference {
    pub const fn millivolts(self) -> Option<i32> {
        match self {
            Reference::Internal => Some(INTERNAL_REFERENCE_MV),
            Reference::VddDiv4 => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputMode {
    SingleEnded,
    /// Negative terminal on a second analog input.
    Differential { negative: AnalogInput },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    Bits8,
    Bits10,
    Bits12,
    Bits14,
}

impl Resolution {
    pub const fn bits(self) -> u32 {
        match self {
            Resolution::Bits8 => 8,
            Resolution::Bits10 => 10,
            Resolution::Bits12 => 12,
            Resolution::Bits14 => 14,
        }
    }
}

/// Static description of one sensing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    pub input: AnalogInput,
    pub gain: Gain,
    pub reference: Reference,
    pub mode: InputMode,
}

impl ChannelConfig {
    pub const fn single_ended(input: AnalogInput, gain: Gain, reference: Reference) -> Self {
        Self {
            input,
            gain,
            reference,
            mode: InputMode::SingleEnded,
        }
    }

    pub const fn differential(
        positive: AnalogInput,
        negative: AnalogInput,
        gain: Gain,
        reference: Reference,
    ) -> Self {
        Self {
            input: positive,
            gain,
            reference,
            mode: InputMode::Differential { negative },
        }
    }

    pub const fn is_differential(&self) -> bool {
        matches!(self.mode, InputMode::Differential { .. })
    }
}

/// Convert one raw SAADC result to millivolts.
///
/// Returns `None` when the channel's reference has no fixed voltage.
/// Single-ended inputs can report small negative codes from offset noise;
/// those clamp to zero. Differential results keep their sign.
pub fn raw_to_millivolts(raw: i16, config: &ChannelConfig, resolution: Resolution) -> Option<i32> {
    let reference_mv = config.reference.millivolts()?;
    let (gain_num, gain_den) = config.gain.ratio();

    let (raw, shift) = match config.mode {
        InputMode::SingleEnded => (i64::from(raw.max(0)), resolution.bits()),
        InputMode::Differential { .. } => (i64::from(raw), resolution.bits() - 1),
    };

    let numerator = raw * i64::from(reference_mv) * i64::from(gain_den);
    let denominator = i64::from(gain_num) << shift;
    Some((numerator / denominator) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AIN0: ChannelConfig =
        ChannelConfig::single_ended(AnalogInput::Ain(0), Gain::Gain1_6, Reference::Internal);

    #[test]
    fn full_scale_single_ended_is_just_under_3600_mv() {
        // 0.6 V / (1/6) = 3.6 V full scale.
        assert_eq!(raw_to_millivolts(4095, &AIN0, Resolution::Bits12), Some(3599));
        assert_eq!(raw_to_millivolts(2048, &AIN0, Resolution::Bits12), Some(1800));
        assert_eq!(raw_to_millivolts(0, &AIN0, Resolution::Bits12), Some(0));
    }

    #[test]
    fn single_ended_negative_noise_clamps_to_zero() {
        assert_eq!(raw_to_millivolts(-3, &AIN0, Resolution::Bits12), Some(0));
    }

    #[test]
    fn differential_keeps_sign_and_uses_one_less_bit() {
        let cfg = ChannelConfig::differential(
            AnalogInput::Ain(0),
            AnalogInput::Ain(1),
            Gain::Gain1_6,
            Reference::Internal,
        );
        assert!(cfg.is_differential());
        assert_eq!(raw_to_millivolts(1024, &cfg, Resolution::Bits12), Some(1800));
        assert_eq!(raw_to_millivolts(-1024, &cfg, Resolution::Bits12), Some(-1800));
    }

    #[test]
    fn higher_gain_narrows_range() {
        let cfg = ChannelConfig::single_ended(AnalogInput::Ain(2), Gain::Gain4, Reference::Internal);
        // 0.6 V / 4 = 150 mV full scale at 10 bits.
        assert_eq!(raw_to_millivolts(1023, &cfg, Resolution::Bits10), Some(149));
        assert_eq!(raw_to_millivolts(512, &cfg, Resolution::Bits10), Some(75));
    }

    #[test]
    fn vdd_reference_has_no_millivolt_conversion() {
        let cfg = ChannelConfig::single_ended(AnalogInput::Ain(3), Gain::Gain1_4, Reference::VddDiv4);
        assert_eq!(raw_to_millivolts(1000, &cfg, Resolution::Bits12), None);
    }

    #[test]
    fn resolution_bits() {
        assert_eq!(Resolution::Bits8.bits(), 8);
        assert_eq!(Resolution::Bits14.bits(), 14);
    }
}
