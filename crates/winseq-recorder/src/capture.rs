//! Capture sources - where raw events come from
//!
//! OS hooks are platform specific; everything the recorder needs is the
//! `CaptureSource` seam. `EventHub` is an in-process source fed by whoever
//! owns the real hook (or a test, or a JSON-lines pipe).

use crate::events::RawEvent;
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use winseq_core::{Error, ErrorCode, Result};

pub type SubscriptionId = u64;

/// A producer of raw input events
pub trait CaptureSource: Send + Sync {
    /// Start delivering events to `tx` until unsubscribed
    fn subscribe(&self, tx: Sender<RawEvent>) -> Result<SubscriptionId>;

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;
}

/// Fan-out hub: every emitted event goes to every live subscriber
#[derive(Default)]
pub struct EventHub {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Sender<RawEvent>)>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event; returns how many subscribers accepted it.
    ///
    /// A full subscriber buffer drops the event for that subscriber only.
    pub fn emit(&self, event: RawEvent) -> usize {
        let mut subs = self.subscribers.lock();
        let mut delivered = 0;
        subs.retain(|(id, tx)| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("subscriber {} buffer full, dropping event", id);
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("subscriber {} gone", id);
                false
            }
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl CaptureSource for EventHub {
    fn subscribe(&self, tx: Sender<RawEvent>) -> Result<SubscriptionId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscribers.lock().push((id, tx));
        debug!("subscriber {} attached", id);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<()> {
        let mut subs = self.subscribers.lock();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        if subs.len() == before {
            return Err(Error::new(
                ErrorCode::NotFound,
                format!("No subscription with id {}", id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn fans_out_to_subscribers() {
        let hub = EventHub::new();
        let (tx1, rx1) = bounded(8);
        let (tx2, rx2) = bounded(8);
        let a = hub.subscribe(tx1).unwrap();
        hub.subscribe(tx2).unwrap();

        assert_eq!(hub.emit(RawEvent::moved(0.0, 1.0, 1.0)), 2);
        assert_eq!(rx1.len(), 1);
        assert_eq!(rx2.len(), 1);

        hub.unsubscribe(a).unwrap();
        assert_eq!(hub.emit(RawEvent::moved(0.1, 2.0, 2.0)), 1);
        assert_eq!(rx1.len(), 1);
        assert!(hub.unsubscribe(a).is_err());
    }

    #[test]
    fn drops_disconnected_subscribers() {
        let hub = EventHub::new();
        let (tx, rx) = bounded(1);
        hub.subscribe(tx).unwrap();
        drop(rx);
        assert_eq!(hub.emit(RawEvent::key_down(0.0, 'a')), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn full_buffer_keeps_subscriber() {
        let hub = EventHub::new();
        let (tx, rx) = bounded(1);
        hub.subscribe(tx).unwrap();
        assert_eq!(hub.emit(RawEvent::key_down(0.0, 'a')), 1);
        assert_eq!(hub.emit(RawEvent::key_down(0.1, 'b')), 0);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(rx.len(), 1);
    }
}
