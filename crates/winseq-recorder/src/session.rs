//! Recording session - owns the coalescer lifecycle
//!
//! `start` subscribes a bounded channel to the capture source and hands the
//! receiving end to a coalescer worker thread. `stop` unsubscribes, signals the
//! worker, which drains whatever is still queued, flushes and returns the
//! finished sequence.

use crate::capture::{CaptureSource, SubscriptionId};
use crate::coalescer::Coalescer;
use crate::config::RecordingConfig;
use crate::events::RawEvent;
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use winseq_core::{ActionSequence, Error, ErrorCode, Result};

struct ActiveRecording {
    subscription: SubscriptionId,
    stop_tx: Sender<()>,
    worker: thread::JoinHandle<Result<ActionSequence>>,
    started: Instant,
}

/// Runtime context for recording: one capture source, at most one active
/// session, and the last finished sequence
pub struct Recorder {
    source: Arc<dyn CaptureSource>,
    active: Mutex<Option<ActiveRecording>>,
    last: Mutex<Option<ActionSequence>>,
}

impl Recorder {
    pub fn new(source: Arc<dyn CaptureSource>) -> Self {
        Self {
            source,
            active: Mutex::new(None),
            last: Mutex::new(None),
        }
    }

    pub fn start(&self, config: RecordingConfig) -> Result<()> {
        config.validate()?;

        let mut active = self.active.lock();
        if active.is_some() {
            return Err(Error::already_recording());
        }

        let (events_tx, events_rx) = bounded(config.max_buffer);
        let (stop_tx, stop_rx) = bounded(1);
        let subscription = self.source.subscribe(events_tx)?;

        let worker = thread::Builder::new()
            .name("winseq-coalescer".into())
            .spawn(move || coalesce(config, events_rx, stop_rx));

        let worker = match worker {
            Ok(w) => w,
            Err(e) => {
                if let Err(u) = self.source.unsubscribe(subscription) {
                    warn!("unsubscribe after failed spawn: {}", u);
                }
                return Err(e.into());
            }
        };

        info!("Recording started (subscription {})", subscription);
        *active = Some(ActiveRecording {
            subscription,
            stop_tx,
            worker,
            started: Instant::now(),
        });
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Stop recording and return the finished sequence.
    ///
    /// Events the capture source accepted before this call are all included.
    pub fn stop(&self) -> Result<ActionSequence> {
        let mut active = self.active.lock();
        let rec = active.take().ok_or_else(Error::not_recording)?;

        if let Err(e) = self.source.unsubscribe(rec.subscription) {
            warn!("unsubscribe {} failed: {}", rec.subscription, e);
        }
        // The worker may already have exited on disconnect
        let _ = rec.stop_tx.send(());

        let sequence = rec
            .worker
            .join()
            .map_err(|_| Error::new(ErrorCode::Unknown, "Coalescer worker panicked"))??;

        info!(
            "Recording stopped: {} actions in {:.1}s",
            sequence.len(),
            rec.started.elapsed().as_secs_f64()
        );
        *self.last.lock() = Some(sequence.clone());
        Ok(sequence)
    }

    /// The sequence produced by the most recent `stop`
    pub fn last_recorded(&self) -> Option<ActionSequence> {
        self.last.lock().clone()
    }
}

fn coalesce(
    config: RecordingConfig,
    events: Receiver<RawEvent>,
    stop: Receiver<()>,
) -> Result<ActionSequence> {
    let mut coalescer = Coalescer::new(config);
    let mut seen = 0usize;

    loop {
        select! {
            recv(events) -> ev => match ev {
                Ok(ev) => {
                    coalescer.push(ev);
                    seen += 1;
                }
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        }
    }

    // Drain in-flight events
    for ev in events.try_iter() {
        coalescer.push(ev);
        seen += 1;
    }

    debug!("coalescer saw {} events", seen);
    coalescer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::EventHub;

    #[test]
    fn lifecycle_errors() {
        let hub = Arc::new(EventHub::new());
        let recorder = Recorder::new(hub.clone());

        assert!(!recorder.is_running());
        assert_eq!(recorder.stop().unwrap_err().code, ErrorCode::NotRecording);

        recorder.start(RecordingConfig::default()).unwrap();
        assert!(recorder.is_running());
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(
            recorder
                .start(RecordingConfig::default())
                .unwrap_err()
                .code,
            ErrorCode::AlreadyRecording
        );

        let seq = recorder.stop().unwrap();
        assert!(seq.is_empty());
        assert!(!recorder.is_running());
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(recorder.stop().unwrap_err().code, ErrorCode::NotRecording);
    }

    #[test]
    fn invalid_config_does_not_start() {
        let recorder = Recorder::new(Arc::new(EventHub::new()));
        let err = recorder
            .start(RecordingConfig::default().hotkey(20, "x"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAction);
        assert!(!recorder.is_running());
    }
}
