//! Click prompter - answers `prompt_point` with the next mouse press
//!
//! Each prompt subscribes its own bounded channel to the capture source and
//! drops the subscription once it resolves, times out or the source goes away.

use crate::capture::CaptureSource;
use crate::events::{EventData, RawEvent};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};
use winseq_core::{Error, Point, PointPrompter, PointRequest, Result};

const PROMPT_BUFFER: usize = 64;

/// Resolves a point prompt with wherever the user presses a mouse button next
pub struct ClickPrompter {
    source: Arc<dyn CaptureSource>,
}

impl ClickPrompter {
    pub fn new(source: Arc<dyn CaptureSource>) -> Self {
        Self { source }
    }
}

impl PointPrompter for ClickPrompter {
    /// Sleeps through `countdown`, then captures. `timeout` counts from the
    /// end of the countdown.
    fn prompt(&self, request: &PointRequest<'_>) -> Result<Point> {
        info!("{}", request.describe());
        if let Some(countdown) = request.countdown.filter(|c| !c.is_zero()) {
            info!("capturing in {:.1}s", countdown.as_secs_f64());
            thread::sleep(countdown);
        }

        let (tx, rx) = bounded(PROMPT_BUFFER);
        let id = self.source.subscribe(tx)?;
        debug!("prompt '{}' listening on subscription {}", request.var, id);

        let result = next_press(&rx, request);
        if let Err(e) = self.source.unsubscribe(id) {
            warn!("unsubscribe after prompt: {}", e);
        }
        result
    }
}

fn next_press(rx: &Receiver<RawEvent>, request: &PointRequest<'_>) -> Result<Point> {
    let deadline = request.timeout.map(|t| (Instant::now() + t, t));
    let disconnected = || Error::collaborator_failure("prompt_point", "capture source closed");

    loop {
        let event = match deadline {
            Some((at, t)) => rx.recv_deadline(at).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    Error::prompt_timeout(request.var, t.as_millis() as u64)
                }
                RecvTimeoutError::Disconnected => disconnected(),
            })?,
            None => rx.recv().map_err(|_| disconnected())?,
        };
        if let EventData::ButtonDown { x, y, .. } = event.data {
            return Ok(Point::new(x, y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::EventHub;
    use std::time::Duration;
    use winseq_core::{ErrorCode, MouseButton};

    fn when_listening(hub: &EventHub) {
        while hub.subscriber_count() == 0 {
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn next_press_resolves_the_prompt() {
        let hub = Arc::new(EventHub::new());
        let prompter = ClickPrompter::new(hub.clone());

        let clicker = {
            let hub = hub.clone();
            thread::spawn(move || {
                when_listening(&hub);
                hub.emit(RawEvent::moved(0.0, 1.0, 1.0));
                hub.emit(RawEvent::key_down(0.1, 'a'));
                hub.emit(RawEvent::button_down(0.2, 30.0, 40.0, MouseButton::Right));
                hub.emit(RawEvent::button_down(0.3, 90.0, 90.0, MouseButton::Left));
            })
        };

        let p = prompter
            .prompt(&PointRequest::new("target").timeout(Some(Duration::from_secs(5))))
            .unwrap();
        clicker.join().unwrap();
        assert_eq!(p, Point::new(30.0, 40.0));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn timeout_releases_the_subscription() {
        let hub = Arc::new(EventHub::new());
        let prompter = ClickPrompter::new(hub.clone());
        let err = prompter
            .prompt(&PointRequest::new("target").timeout(Some(Duration::from_millis(20))))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PromptTimeout);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.emit(RawEvent::moved(0.0, 1.0, 1.0)), 0);
    }

    #[test]
    fn countdown_runs_before_capture() {
        let hub = Arc::new(EventHub::new());
        let prompter = ClickPrompter::new(hub.clone());
        let countdown = Duration::from_millis(40);

        let clicker = {
            let hub = hub.clone();
            thread::spawn(move || {
                when_listening(&hub);
                hub.emit(RawEvent::button_down(1.0, 6.0, 7.0, MouseButton::Left));
            })
        };

        let started = Instant::now();
        let p = prompter
            .prompt(
                &PointRequest::new("target")
                    .countdown(Some(countdown))
                    .timeout(Some(Duration::from_secs(5))),
            )
            .unwrap();
        assert!(started.elapsed() >= countdown);
        clicker.join().unwrap();
        assert_eq!(p, Point::new(6.0, 7.0));
        assert_eq!(hub.subscriber_count(), 0);
    }
}
