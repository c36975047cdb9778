//! nRF52840 SAADC driver glue.
//!
//! One conversion round samples every sensing channel plus the VDD monitor
//! in a single scan. The round is bounded by `SAMPLE_TIMEOUT_MS`; a round
//! that does not finish marks every channel as failed for this cycle.

use embassy_nrf::saadc::{self, AnyInput, Saadc, VddInput};
use embassy_nrf::interrupt::InterruptExt;
use embassy_nrf::{bind_interrupts, interrupt, peripherals};
use embassy_time::{with_timeout, Duration};

use super::{ChannelConfig, Gain, InputMode, ReadError, Reference, Resolution};
use crate::config::{ADC_RESOLUTION, CHANNEL_COUNT, SAMPLE_TIMEOUT_MS, VDD_CHANNEL};
use crate::error::Error;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
});

/// Sensing channels plus the VDD monitor, last.
const SCAN_LEN: usize = CHANNEL_COUNT + 1;

/// Pins wired to one sensing channel.
pub struct ChannelPins {
    pub positive: AnyInput,
    /// Required when the channel is configured differential.
    pub negative: Option<AnyInput>,
}

/// Raw results of one conversion round.
pub struct Scan {
    pub channels: [Result<i16, ReadError>; CHANNEL_COUNT],
    pub vdd: Result<i16, ReadError>,
}

pub struct SensorAdc {
    saadc: Saadc<'static, SCAN_LEN>,
}

fn gain(g: Gain) -> saadc::Gain {
    match g {
        Gain::Gain1_6 => saadc::Gain::GAIN1_6,
        Gain::Gain1_5 => saadc::Gain::GAIN1_5,
        Gain::Gain1_4 => saadc::Gain::GAIN1_4,
        Gain::Gain1_3 => saadc::Gain::GAIN1_3,
        Gain::Gain1_2 => saadc::Gain::GAIN1_2,
        Gain::Gain1 => saadc::Gain::GAIN1,
        Gain::Gain2 => saadc::Gain::GAIN2,
        Gain::Gain4 => saadc::Gain::GAIN4,
    }
}

fn reference(r: Reference) -> saadc::Reference {
    match r {
        Reference::Internal => saadc::Reference::INTERNAL,
        Reference::VddDiv4 => saadc::Reference::VDD1_4,
    }
}

fn resolution(r: Resolution) -> saadc::Resolution {
    match r {
        Resolution::Bits8 => saadc::Resolution::_8BIT,
        Resolution::Bits10 => saadc::Resolution::_10BIT,
        Resolution::Bits12 => saadc::Resolution::_12BIT,
        Resolution::Bits14 => saadc::Resolution::_14BIT,
    }
}

fn channel_config(cfg: &ChannelConfig, pins: ChannelPins) -> saadc::ChannelConfig<'static> {
    let mut c = match (cfg.mode, pins.negative) {
        (InputMode::Differential { .. }, Some(negative)) => {
            saadc::ChannelConfig::differential(pins.positive, negative)
        }
        (InputMode::Differential { .. }, None) => {
            defmt::warn!("Differential channel without negative pin, sampling single-ended");
            saadc::ChannelConfig::single_ended(pins.positive)
        }
        (InputMode::SingleEnded, _) => saadc::ChannelConfig::single_ended(pins.positive),
    };
    c.gain = gain(cfg.gain);
    c.reference = reference(cfg.reference);
    c
}

fn vdd_config() -> saadc::ChannelConfig<'static> {
    let mut c = saadc::ChannelConfig::single_ended(VddInput);
    c.gain = gain(VDD_CHANNEL.gain);
    c.reference = reference(VDD_CHANNEL.reference);
    c
}

impl SensorAdc {
    /// Configure and calibrate the SAADC.
    ///
    /// Fails with `AdcNotReady` when calibration does not complete.
    pub async fn new(
        adc: peripherals::SAADC,
        configs: &[ChannelConfig; CHANNEL_COUNT],
        pins: [ChannelPins; CHANNEL_COUNT],
    ) -> Result<Self, Error> {
        let mut config = saadc::Config::default();
        config.resolution = resolution(ADC_RESOLUTION);

        // Sensing channels in table order, then the VDD monitor.
        let mut wired = pins.into_iter().zip(configs.iter());
        let channels: [saadc::ChannelConfig<'static>; SCAN_LEN] =
            core::array::from_fn(|_| match wired.next() {
                Some((p, cfg)) => channel_config(cfg, p),
                None => vdd_config(),
            });

        // Must sit below the SoftDevice's reserved priorities.
        interrupt::SAADC.set_priority(interrupt::Priority::P3);
        let mut saadc = Saadc::new(adc, Irqs, config, channels);

        with_timeout(Duration::from_millis(SAMPLE_TIMEOUT_MS * 10), saadc.calibrate())
            .await
            .map_err(|_| Error::AdcNotReady)?;

        Ok(Self { saadc })
    }

    /// Run one conversion round.
    pub async fn scan(&mut self) -> Scan {
        let mut buf = [0i16; SCAN_LEN];
        match with_timeout(
            Duration::from_millis(SAMPLE_TIMEOUT_MS),
            self.saadc.sample(&mut buf),
        )
        .await
        {
            Ok(()) => Scan {
                channels: core::array::from_fn(|i| Ok(buf[i])),
                vdd: Ok(buf[CHANNEL_COUNT]),
            },
            Err(_) => Scan {
                channels: [Err(ReadError::Timeout); CHANNEL_COUNT],
                vdd: Err(ReadError::Timeout),
            },
        }
    }
}
