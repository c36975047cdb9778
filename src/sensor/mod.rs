//! Channel sampler state.
//!
//! The hardware read lives in `saadc` (embedded only). Everything here is
//! plain data: a bank of channels takes one raw result per channel, converts
//! it, and keeps the last good value so a failed read never shrinks the
//! snapshot.

mod convert;
#[cfg(feature = "embedded")]
pub mod saadc;

pub use convert::{
    raw_to_millivolts, AnalogInput, ChannelConfig, Gain, InputMode, Reference, Resolution,
    INTERNAL_REFERENCE_MV,
};

/// Why a single channel produced no sample this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError {
    /// Conversion did not finish in time.
    Timeout,
}

/// Result of one channel for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelReading {
    /// Sampled and converted.
    Fresh { raw: i16, mv: i32 },
    /// Sampled, but the channel has no mV conversion. Last value reused.
    Unconverted { raw: i16 },
    /// Read failed. Last value reused.
    ReadFailed(ReadError),
}

impl ChannelReading {
    pub fn is_fresh(&self) -> bool {
        matches!(self, ChannelReading::Fresh { .. })
    }
}

/// Ordered converted values, one per channel, in millivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Snapshot<const N: usize>([i32; N]);

impl<const N: usize> Snapshot<N> {
    pub const fn new(values: [i32; N]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[i32; N] {
        &self.0
    }
}

impl<const N: usize> Default for Snapshot<N> {
    fn default() -> Self {
        Self([0; N])
    }
}

/// One configured channel and its last results.
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    config: ChannelConfig,
    last_raw: i16,
    last_mv: i32,
}

impl Channel {
    pub const fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            last_raw: 0,
            last_mv: 0,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn last_raw(&self) -> i16 {
        self.last_raw
    }

    pub fn last_mv(&self) -> i32 {
        self.last_mv
    }

    fn update(&mut self, sample: Result<i16, ReadError>, resolution: Resolution) -> ChannelReading {
        let raw = match sample {
            Ok(raw) => raw,
            Err(e) => return ChannelReading::ReadFailed(e),
        };
        self.last_raw = raw;

        match raw_to_millivolts(raw, &self.config, resolution) {
            Some(mv) => {
                self.last_mv = mv;
                ChannelReading::Fresh { raw, mv }
            }
            None => ChannelReading::Unconverted { raw },
        }
    }
}

/// Everything the bank learned in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleReport<const N: usize> {
    /// Complete snapshot, stale values filled in for degraded channels.
    pub snapshot: Snapshot<N>,
    /// Per-channel outcome, same order as the snapshot.
    pub readings: [ChannelReading; N],
}

impl<const N: usize> SampleReport<N> {
    /// Number of channels that did not produce a fresh value.
    pub fn degraded_count(&self) -> usize {
        self.readings.iter().filter(|r| !r.is_fresh()).count()
    }
}

/// Fixed set of channels sampled in configuration order.
pub struct ChannelBank<const N: usize> {
    channels: [Channel; N],
    resolution: Resolution,
}

impl<const N: usize> ChannelBank<N> {
    pub fn new(configs: &[ChannelConfig; N], resolution: Resolution) -> Self {
        Self {
            channels: (*configs).map(Channel::new),
            resolution,
        }
    }

    pub fn channels(&self) -> &[Channel; N] {
        &self.channels
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Apply one raw result per channel and build the snapshot.
    ///
    /// The snapshot is built in full before it is returned; channels that
    /// failed keep their previous value (0 before the first good read).
    pub fn apply(&mut self, samples: [Result<i16, ReadError>; N]) -> SampleReport<N> {
        let mut readings = [ChannelReading::ReadFailed(ReadError::Timeout); N];
        let mut values = [0i32; N];

        for (i, (channel, sample)) in self.channels.iter_mut().zip(samples).enumerate() {
            readings[i] = channel.update(sample, self.resolution);
            values[i] = channel.last_mv;
        }

        SampleReport {
            snapshot: Snapshot::new(values),
            readings,
        }
    }

    /// Current values without sampling.
    pub fn snapshot(&self) -> Snapshot<N> {
        Snapshot::new(self.channels.map(|c| c.last_mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CFG: ChannelConfig =
        ChannelConfig::single_ended(AnalogInput::Ain(4), Gain::Gain1_6, Reference::Internal);
    const UNSCALED: ChannelConfig =
        ChannelConfig::single_ended(AnalogInput::Ain(5), Gain::Gain1_4, Reference::VddDiv4);

    #[test]
    fn apply_converts_in_configuration_order() {
        let mut bank = ChannelBank::new(&[CFG; 4], Resolution::Bits12);
        let report = bank.apply([Ok(0), Ok(1024), Ok(2048), Ok(4095)]);
        assert_eq!(report.snapshot.values(), &[0, 900, 1800, 3599]);
        assert_eq!(report.degraded_count(), 0);
        assert_eq!(
            report.readings[1],
            ChannelReading::Fresh { raw: 1024, mv: 900 }
        );
    }

    #[test]
    fn failed_read_keeps_previous_value_and_field_count() {
        let mut bank = ChannelBank::new(&[CFG; 4], Resolution::Bits12);
        bank.apply([Ok(2048), Ok(2048), Ok(2048), Ok(2048)]);

        let report = bank.apply([Ok(1024), Err(ReadError::Timeout), Ok(1024), Ok(1024)]);
        assert_eq!(report.snapshot.values(), &[900, 1800, 900, 900]);
        assert_eq!(report.readings[1], ChannelReading::ReadFailed(ReadError::Timeout));
        assert_eq!(report.degraded_count(), 1);
        assert_eq!(bank.channels()[1].last_raw(), 2048);
    }

    #[test]
    fn failure_before_first_good_read_reports_zero() {
        let mut bank = ChannelBank::new(&[CFG; 2], Resolution::Bits12);
        let report = bank.apply([Err(ReadError::Timeout); 2]);
        assert_eq!(report.snapshot.values(), &[0, 0]);
        assert_eq!(report.degraded_count(), 2);
    }

    #[test]
    fn unconverted_channel_updates_raw_but_not_mv() {
        let mut bank = ChannelBank::new(&[CFG, UNSCALED], Resolution::Bits12);
        let report = bank.apply([Ok(2048), Ok(1500)]);
        assert_eq!(report.readings[1], ChannelReading::Unconverted { raw: 1500 });
        assert_eq!(report.snapshot.values(), &[1800, 0]);
        assert_eq!(bank.channels()[1].last_raw(), 1500);
        assert_eq!(bank.channels()[1].last_mv(), 0);
    }

    #[test]
    fn snapshot_reflects_last_apply() {
        let mut bank = ChannelBank::new(&[CFG; 3], Resolution::Bits12);
        let report = bank.apply([Ok(100), Ok(200), Ok(300)]);
        assert_eq!(bank.snapshot(), report.snapshot);
    }
}
