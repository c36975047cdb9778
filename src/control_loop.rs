//! The sample → format → notify cycle.
//!
//! `ControlLoop` owns the channel bank and the notifier. The embedded
//! control task drives it once per tick:
//!
//! ```text
//! Idle --start_sampling--> Sampling --finish_cycle--> Formatting -> Notifying -> Idle
//! ```
//!
//! Sampling is split out because the SAADC read is async and happens in
//! between; everything else is synchronous and runs in host tests.

use crate::ble::notifier::{Notifier, PublishOutcome, Transport};
use crate::ble::LinkEvent;
use crate::frame::ReadingFrame;
use crate::sensor::{ChannelBank, ChannelConfig, ReadError, Resolution, SampleReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Idle,
    Sampling,
    Formatting,
    Notifying,
}

/// Everything one cycle produced, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport<const N: usize> {
    pub cycle: u32,
    pub samples: SampleReport<N>,
    pub frame: ReadingFrame,
    pub outcome: PublishOutcome,
}

pub struct ControlLoop<const N: usize> {
    bank: ChannelBank<N>,
    notifier: Notifier,
    phase: Phase,
    cycles: u32,
}

impl<const N: usize> ControlLoop<N> {
    pub fn new(channels: &[ChannelConfig; N], resolution: Resolution) -> Self {
        Self {
            bank: ChannelBank::new(channels, resolution),
            notifier: Notifier::new(),
            phase: Phase::Idle,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn bank(&self) -> &ChannelBank<N> {
        &self.bank
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Feed a link event into the notifier state.
    pub fn on_link_event(&mut self, event: &LinkEvent) {
        self.notifier.on_event(event);
    }

    /// Mark the start of a hardware read.
    pub fn start_sampling(&mut self) {
        self.phase = Phase::Sampling;
    }

    /// Consume the raw results, format them and offer the frame to the peer.
    ///
    /// `transport` is `None` while no central is connected. Never fails:
    /// degraded channels and delivery problems are reported, not raised.
    pub fn finish_cycle<T: Transport>(
        &mut self,
        samples: [Result<i16, ReadError>; N],
        transport: Option<&mut T>,
    ) -> CycleReport<N> {
        let samples = self.bank.apply(samples);

        self.phase = Phase::Formatting;
        let frame = ReadingFrame::format(&samples.snapshot);

        self.phase = Phase::Notifying;
        let outcome = self.notifier.publish(frame.as_bytes(), transport);

        self.phase = Phase::Idle;
        self.cycles = self.cycles.wrapping_add(1);

        CycleReport {
            cycle: self.cycles,
            samples,
            frame,
            outcome,
        }
    }

    /// Convenience for callers that already hold the raw results.
    pub fn run_cycle<T: Transport>(
        &mut self,
        samples: [Result<i16, ReadError>; N],
        transport: Option<&mut T>,
    ) -> CycleReport<N> {
        self.start_sampling();
        self.finish_cycle(samples, transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::notifier::{Delivery, TransportError};
    use crate::ble::NotifyTarget;
    use crate::sensor::{AnalogInput, Gain, Reference};

    const CFG: ChannelConfig =
        ChannelConfig::single_ended(AnalogInput::Ain(4), Gain::Gain1_6, Reference::Internal);

    #[derive(Default)]
    struct Capture {
        last: Option<std::vec::Vec<u8>>,
    }

    impl Transport for Capture {
        fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError> {
            self.last = Some(payload.to_vec());
            Ok(())
        }

        fn indicate(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[test]
    fn starts_idle_and_returns_to_idle() {
        let mut cl = ControlLoop::new(&[CFG; 4], Resolution::Bits12);
        assert_eq!(cl.phase(), Phase::Idle);
        cl.start_sampling();
        assert_eq!(cl.phase(), Phase::Sampling);
        let report = cl.finish_cycle::<Capture>([Ok(0); 4], None);
        assert_eq!(cl.phase(), Phase::Idle);
        assert_eq!(report.cycle, 1);
        assert_eq!(cl.cycles(), 1);
    }

    #[test]
    fn cycle_without_link_still_formats() {
        let mut cl = ControlLoop::new(&[CFG; 4], Resolution::Bits12);
        let report = cl.run_cycle::<Capture>([Ok(1024), Ok(2048), Ok(0), Ok(4095)], None);
        assert_eq!(report.frame.as_str(), "0900 1800 0000 3599");
        assert!(report.outcome.is_skipped());
    }

    #[test]
    fn subscribed_peer_receives_frame() {
        let mut cl = ControlLoop::new(&[CFG; 4], Resolution::Bits12);
        cl.on_link_event(&LinkEvent::Connected);
        cl.on_link_event(&LinkEvent::SubscriptionChanged {
            target: NotifyTarget::Data,
            notify: true,
            indicate: false,
        });
        let mut t = Capture::default();
        let report = cl.run_cycle([Ok(1024); 4], Some(&mut t));
        assert_eq!(report.outcome.notification, Delivery::Sent);
        assert_eq!(t.last.as_deref(), Some(&b"0900 0900 0900 0900"[..]));
    }

    #[test]
    fn failed_channel_keeps_field_count() {
        let mut cl = ControlLoop::new(&[CFG; 4], Resolution::Bits12);
        cl.run_cycle::<Capture>([Ok(2048); 4], None);
        let report = cl.run_cycle::<Capture>(
            [Ok(1024), Err(ReadError::Timeout), Ok(1024), Ok(1024)],
            None,
        );
        assert_eq!(report.frame.as_str(), "0900 1800 0900 0900");
        assert_eq!(report.samples.degraded_count(), 1);
        assert_eq!(cl.phase(), Phase::Idle);
    }
}
