//! Sequence execution engine
//!
//! Runs actions strictly in order against the collaborators, keeping one
//! variable environment for the whole run. Per-action failures never escape:
//! they become step entries in the [`ExecutionReport`].

use crate::action::{Action, ActionSequence};
use crate::error::{Error, ErrorCode, Result};
use crate::prompt::{PointPrompter, PointRequest};
use crate::vars::Variables;
use crate::window::{InputInjector, WindowController};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What to do with the rest of the sequence after a step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed step
    #[default]
    Abort,
    /// Attempt every step, still reporting overall failure
    Continue,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub on_error: FailurePolicy,
    /// Default for `prompt_point` actions without their own timeout. `None` waits forever.
    pub prompt_timeout: Option<Duration>,
    /// Playback speed (1.0 = as written, 2.0 = waits take half as long). Must be finite and positive.
    pub speed: f64,
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(Error::invalid_action(format!(
                "speed must be a positive number, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            on_error: FailurePolicy::Abort,
            prompt_timeout: None,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub action: Action,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub success: bool,
    pub steps: Vec<StepReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<usize>,
    /// Environment after the run, including points bound by `prompt_point`
    pub variables: Variables,
}

impl ExecutionReport {
    pub fn failure(&self) -> Option<&StepReport> {
        self.failed_at.and_then(|i| self.steps.iter().find(|s| s.index == i))
    }
}

/// Executes action sequences
pub struct Runner<'a> {
    windows: &'a dyn WindowController,
    input: &'a dyn InputInjector,
    prompter: Option<&'a dyn PointPrompter>,
    config: RunnerConfig,
}

impl<'a> Runner<'a> {
    pub fn new(windows: &'a dyn WindowController, input: &'a dyn InputInjector) -> Self {
        Self {
            windows,
            input,
            prompter: None,
            config: RunnerConfig::default(),
        }
    }

    pub fn prompter(mut self, prompter: &'a dyn PointPrompter) -> Self {
        self.prompter = Some(prompter);
        self
    }

    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_error(mut self, policy: FailurePolicy) -> Self {
        self.config.on_error = policy;
        self
    }

    pub fn prompt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.prompt_timeout = timeout;
        self
    }

    /// Set playback speed (1.0 = real-time, 2.0 = 2x speed)
    pub fn speed(mut self, speed: f64) -> Self {
        self.config.speed = speed;
        self
    }

    /// Validate loosely-typed JSON, then run it. Malformed data fails before any step runs.
    pub fn run_json(
        &self,
        actions: &serde_json::Value,
        initial: Variables,
    ) -> Result<ExecutionReport> {
        self.config.validate()?;
        let seq = ActionSequence::from_json(actions)?;
        Ok(self.run(&seq, initial))
    }

    /// Run a sequence to completion (or to the first failure under [`FailurePolicy::Abort`])
    pub fn run(&self, sequence: &ActionSequence, initial: Variables) -> ExecutionReport {
        let mut vars = initial;
        let mut steps = Vec::with_capacity(sequence.len());
        let mut failed_at = None;

        info!("running {} actions", sequence.len());

        for (index, action) in sequence.iter().enumerate() {
            let started = Instant::now();
            let result = self.step(action, &mut vars);
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(()) => {
                    debug!("step {} {} ok ({}ms)", index, action.kind(), elapsed_ms);
                    steps.push(StepReport {
                        index,
                        action: action.clone(),
                        success: true,
                        error: None,
                        elapsed_ms,
                    });
                }
                Err(e) => {
                    warn!("step {} {} failed: {}", index, action.kind(), e);
                    failed_at.get_or_insert(index);
                    steps.push(StepReport {
                        index,
                        action: action.clone(),
                        success: false,
                        error: Some(e),
                        elapsed_ms,
                    });
                    if self.config.on_error == FailurePolicy::Abort {
                        break;
                    }
                }
            }
        }

        let success = failed_at.is_none();
        info!(
            "run finished: success={} steps={}/{}",
            success,
            steps.len(),
            sequence.len()
        );

        ExecutionReport {
            success,
            steps,
            failed_at,
            variables: vars,
        }
    }

    fn step(&self, action: &Action, vars: &mut Variables) -> Result<()> {
        let kind = action.kind();
        match action {
            Action::FocusWindow { name } => self.windows.focus(name).map_err(wrap(kind)),

            Action::MoveMouse { to } => {
                let p = vars.resolve(to)?;
                self.input.move_to(p).map_err(wrap(kind))
            }

            Action::Hover { to, seconds } => {
                let p = vars.resolve(to)?;
                self.input.move_to(p).map_err(wrap(kind))?;
                self.pause(*seconds)
            }

            Action::Click {
                to,
                button,
                count,
                interval,
            } => {
                if let Some(to) = to {
                    let p = vars.resolve(to)?;
                    self.input.move_to(p).map_err(wrap(kind))?;
                }
                for i in 0..*count {
                    if i > 0 {
                        self.pause(*interval)?;
                    }
                    self.input.click(*button).map_err(wrap(kind))?;
                }
                Ok(())
            }

            Action::SendText {
                text,
                window,
                send_newline,
            } => {
                let target = window.as_deref();
                self.windows.send_keys(text, target).map_err(wrap(kind))?;
                if *send_newline {
                    self.windows.send_key("enter", target).map_err(wrap(kind))?;
                }
                Ok(())
            }

            Action::Key { key, window } => self
                .windows
                .send_key(key, window.as_deref())
                .map_err(wrap(kind)),

            Action::Wait { seconds } => self.pause(*seconds),

            Action::PromptPoint {
                var,
                message,
                timeout,
                countdown,
            } => {
                let prompter = self.prompter.ok_or_else(|| {
                    Error::collaborator_failure(kind, "no point source configured")
                })?;
                let timeout = match timeout {
                    Some(t) => Some(seconds_to_duration("prompt_point.timeout", *t)?),
                    None => self.config.prompt_timeout,
                };
                let request = PointRequest::new(var)
                    .message(message.as_deref())
                    .timeout(timeout)
                    .countdown(countdown.map(|s| Duration::from_secs(s.into())));
                let p = prompter.prompt(&request).map_err(wrap(kind))?;
                debug!("bound {} = {}", var, p);
                vars.bind(var.clone(), p);
                Ok(())
            }
        }
    }

    fn pause(&self, seconds: f64) -> Result<()> {
        self.config.validate()?;
        let secs = seconds / self.config.speed;
        if secs > 0.0 {
            std::thread::sleep(seconds_to_duration("pause", secs)?);
        }
        Ok(())
    }
}

fn seconds_to_duration(field: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        Error::invalid_action(format!("{} of {} seconds is out of range", field, seconds))
    })
}

/// Attribute a collaborator error to the action that triggered it.
/// Errors that already carry a precise code pass through unchanged.
fn wrap(kind: &'static str) -> impl Fn(Error) -> Error {
    move |e| match e.code {
        ErrorCode::PromptTimeout | ErrorCode::UnboundVariable | ErrorCode::CollaboratorFailure => e,
        _ => {
            let mut wrapped = Error::collaborator_failure(kind, &e.message);
            wrapped.suggestions = e.suggestions;
            if let Some(ctx) = e.context {
                wrapped.context = Some(serde_json::json!({ "action": kind, "cause": ctx }));
            }
            wrapped
        }
    }
}
