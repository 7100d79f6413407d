//! Point prompts - how a `prompt_point` action gets its coordinate

use crate::action::Point;
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::info;

/// What a `prompt_point` step asks for
#[derive(Debug, Clone, Copy)]
pub struct PointRequest<'a> {
    pub var: &'a str,
    pub message: Option<&'a str>,
    /// `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Grace period before capture starts
    pub countdown: Option<Duration>,
}

impl<'a> PointRequest<'a> {
    pub fn new(var: &'a str) -> Self {
        Self {
            var,
            message: None,
            timeout: None,
            countdown: None,
        }
    }

    pub fn message(mut self, message: Option<&'a str>) -> Self {
        self.message = message;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn countdown(mut self, countdown: Option<Duration>) -> Self {
        self.countdown = countdown;
        self
    }

    /// Log line shown while waiting
    pub fn describe(&self) -> String {
        format!(
            "waiting for point '{}'{}",
            self.var,
            self.message.map(|m| format!(": {}", m)).unwrap_or_default()
        )
    }
}

/// Supplies a point when a run reaches `prompt_point`
pub trait PointPrompter: Send + Sync {
    /// Block until a point arrives or the request times out
    fn prompt(&self, request: &PointRequest<'_>) -> Result<Point>;
}

/// Prompter fed through a channel: a click listener or the caller pushes
/// points into the paired [`PointSender`].
pub struct ChannelPrompter {
    rx: Receiver<Point>,
}

/// Sending half of a [`ChannelPrompter`]
#[derive(Clone)]
pub struct PointSender {
    tx: Sender<Point>,
}

impl PointSender {
    /// Deliver a point to the waiting run. Returns false if the prompter is gone.
    pub fn send(&self, point: Point) -> bool {
        self.tx.send(point).is_ok()
    }
}

impl ChannelPrompter {
    pub fn new() -> (Self, PointSender) {
        let (tx, rx) = bounded(16);
        (Self { rx }, PointSender { tx })
    }
}

impl PointPrompter for ChannelPrompter {
    /// Points come from the caller, so `countdown` does not apply
    fn prompt(&self, request: &PointRequest<'_>) -> Result<Point> {
        info!("{}", request.describe());

        let disconnected =
            || Error::collaborator_failure("prompt_point", "point source disconnected");

        match request.timeout {
            Some(t) => self.rx.recv_timeout(t).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    Error::prompt_timeout(request.var, t.as_millis() as u64)
                }
                RecvTimeoutError::Disconnected => disconnected(),
            }),
            None => self.rx.recv().map_err(|_| disconnected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::thread;

    #[test]
    fn delivers_point_from_other_thread() {
        let (prompter, sender) = ChannelPrompter::new();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.send(Point::new(7.0, 8.0))
        });
        let p = prompter
            .prompt(&PointRequest::new("p1").timeout(Some(Duration::from_secs(5))))
            .unwrap();
        assert_eq!(p, Point::new(7.0, 8.0));
        assert!(t.join().unwrap());
    }

    #[test]
    fn times_out() {
        let (prompter, _sender) = ChannelPrompter::new();
        let err = prompter
            .prompt(
                &PointRequest::new("p1")
                    .message(Some("click it"))
                    .timeout(Some(Duration::from_millis(10))),
            )
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PromptTimeout);
    }

    #[test]
    fn disconnected_sender_fails() {
        let (prompter, sender) = ChannelPrompter::new();
        drop(sender);
        let err = prompter.prompt(&PointRequest::new("p1")).unwrap_err();
        assert_eq!(err.code, ErrorCode::CollaboratorFailure);
    }
}
