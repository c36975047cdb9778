//! Delivery of the reading frame to the subscribed central.
//!
//! The notifier keeps the subscription state learned from link events and
//! decides, once per cycle, whether to notify and whether to indicate.
//! At most one indication is in flight; the confirmation (or its failure)
//! clears it.

use super::LinkEvent;
use super::NotifyTarget;

/// Why the transport refused a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Link dropped between the event and the send.
    Disconnected,
    /// Stack ran out of TX buffers.
    NoResources,
    /// Raw stack error code.
    Raw(u32),
}

/// Push interface to the data characteristic of the current link.
pub trait Transport {
    fn notify(&mut self, payload: &[u8]) -> Result<(), TransportError>;
    fn indicate(&mut self, payload: &[u8]) -> Result<(), TransportError>;
}

/// What happened on one delivery path this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Delivery {
    /// Peer not subscribed on this path, or no link.
    Skipped,
    /// Handed to the stack.
    Sent,
    /// Indication only: previous one still unconfirmed.
    Pending,
    /// Stack refused it.
    Failed(TransportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PublishOutcome {
    pub notification: Delivery,
    pub indication: Delivery,
}

impl PublishOutcome {
    pub const SKIPPED: Self = Self {
        notification: Delivery::Skipped,
        indication: Delivery::Skipped,
    };

    /// Nothing was attempted on either path.
    pub fn is_skipped(&self) -> bool {
        *self == Self::SKIPPED
    }
}

#[derive(Debug, Default)]
pub struct Notifier {
    connected: bool,
    notify_enabled: bool,
    indicate_enabled: bool,
    indication_in_flight: bool,
}

impl Notifier {
    pub const fn new() -> Self {
        Self {
            connected: false,
            notify_enabled: false,
            indicate_enabled: false,
            indication_in_flight: false,
        }
    }

    pub fn on_event(&mut self, event: &LinkEvent) {
        match *event {
            LinkEvent::Connected => {
                self.connected = true;
            }
            LinkEvent::Disconnected => {
                *self = Self::new();
            }
            LinkEvent::SubscriptionChanged {
                target: NotifyTarget::Data,
                notify,
                indicate,
            } => {
                // An outstanding indication stays outstanding across CCCD
                // changes; only its confirmation or failure ends it.
                self.notify_enabled = notify;
                self.indicate_enabled = indicate;
            }
            LinkEvent::IndicateAcked | LinkEvent::IndicateFailed => {
                self.indication_in_flight = false;
            }
            _ => {}
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_subscribed(&self) -> bool {
        self.connected && (self.notify_enabled || self.indicate_enabled)
    }

    pub fn indication_in_flight(&self) -> bool {
        self.indication_in_flight
    }

    /// Offer one payload to the peer.
    ///
    /// `transport` is `None` when there is no link. Without a subscriber
    /// this has no side effect.
    pub fn publish<T: Transport>(
        &mut self,
        payload: &[u8],
        transport: Option<&mut T>,
    ) -> PublishOutcome {
        let Some(transport) = transport else {
            return PublishOutcome::SKIPPED;
        };
        if !self.connected {
            return PublishOutcome::SKIPPED;
        }

        let notification = if self.notify_enabled {
            match transport.notify(payload) {
                Ok(()) => Delivery::Sent,
                Err(e) => Delivery::Failed(e),
            }
        } else {
            Delivery::Skipped
        };

        let indication = if !self.indicate_enabled {
            Delivery::Skipped
        } else if self.indication_in_flight {
            Delivery::Pending
        } else {
            match transport.indicate(payload) {
                Ok(()) => {
                    self.indication_in_flight = true;
                    Delivery::Sent
                }
                Err(e) => Delivery::Failed(e),
            }
        };

        PublishOutcome {
            notification,
            indication,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        notified: usize,
        indicated: usize,
        fail_notify: Option<TransportError>,
    }

    impl Transport for Recorder {
        fn notify(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
            if let Some(e) = self.fail_notify {
                return Err(e);
            }
            self.notified += 1;
            Ok(())
        }

        fn indicate(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
            self.indicated += 1;
            Ok(())
        }
    }

    fn subscribed(notify: bool, indicate: bool) -> Notifier {
        let mut n = Notifier::new();
        n.on_event(&LinkEvent::Connected);
        n.on_event(&LinkEvent::SubscriptionChanged {
            target: NotifyTarget::Data,
            notify,
            indicate,
        });
        n
    }

    #[test]
    fn no_subscriber_is_a_silent_no_op() {
        let mut n = Notifier::new();
        n.on_event(&LinkEvent::Connected);
        let mut t = Recorder::default();
        let out = n.publish(b"0000 0000 0000 0000", Some(&mut t));
        assert!(out.is_skipped());
        assert_eq!((t.notified, t.indicated), (0, 0));
    }

    #[test]
    fn no_link_is_skipped() {
        let mut n = subscribed(true, true);
        let out = n.publish::<Recorder>(b"x", None);
        assert!(out.is_skipped());
    }

    #[test]
    fn notify_only() {
        let mut n = subscribed(true, false);
        let mut t = Recorder::default();
        let out = n.publish(b"x", Some(&mut t));
        assert_eq!(out.notification, Delivery::Sent);
        assert_eq!(out.indication, Delivery::Skipped);
        assert_eq!(t.notified, 1);
    }

    #[test]
    fn at_most_one_indication_in_flight() {
        let mut n = subscribed(false, true);
        let mut t = Recorder::default();

        assert_eq!(n.publish(b"a", Some(&mut t)).indication, Delivery::Sent);
        assert!(n.indication_in_flight());
        assert_eq!(n.publish(b"b", Some(&mut t)).indication, Delivery::Pending);
        assert_eq!(t.indicated, 1);

        n.on_event(&LinkEvent::IndicateAcked);
        assert_eq!(n.publish(b"c", Some(&mut t)).indication, Delivery::Sent);
        assert_eq!(t.indicated, 2);
    }

    #[test]
    fn cccd_toggle_does_not_release_pending_indication() {
        let mut n = subscribed(false, true);
        let mut t = Recorder::default();
        assert_eq!(n.publish(b"a", Some(&mut t)).indication, Delivery::Sent);

        for indicate in [false, true] {
            n.on_event(&LinkEvent::SubscriptionChanged {
                target: NotifyTarget::Data,
                notify: false,
                indicate,
            });
        }

        assert!(n.indication_in_flight());
        assert_eq!(n.publish(b"b", Some(&mut t)).indication, Delivery::Pending);
        assert_eq!(t.indicated, 1);
    }

    #[test]
    fn indication_failure_also_clears_in_flight() {
        let mut n = subscribed(false, true);
        let mut t = Recorder::default();
        n.publish(b"a", Some(&mut t));
        n.on_event(&LinkEvent::IndicateFailed);
        assert!(!n.indication_in_flight());
    }

    #[test]
    fn disconnect_resets_subscription_and_in_flight() {
        let mut n = subscribed(true, true);
        let mut t = Recorder::default();
        n.publish(b"a", Some(&mut t));
        n.on_event(&LinkEvent::Disconnected);
        assert!(!n.is_connected());
        assert!(!n.is_subscribed());
        assert!(!n.indication_in_flight());
    }

    #[test]
    fn transport_failure_is_reported_not_fatal() {
        let mut n = subscribed(true, false);
        let mut t = Recorder {
            fail_notify: Some(TransportError::NoResources),
            ..Default::default()
        };
        let out = n.publish(b"x", Some(&mut t));
        assert_eq!(out.notification, Delivery::Failed(TransportError::NoResources));
        t.fail_notify = None;
        assert_eq!(n.publish(b"x", Some(&mut t)).notification, Delivery::Sent);
    }

    #[test]
    fn battery_subscription_does_not_touch_data_path() {
        let mut n = Notifier::new();
        n.on_event(&LinkEvent::Connected);
        n.on_event(&LinkEvent::SubscriptionChanged {
            target: NotifyTarget::Battery,
            notify: true,
            indicate: false,
        });
        assert!(!n.is_subscribed());
    }
}
