//! Temporal coalescer - turns a raw event stream into replayable actions
//!
//! Rules, applied in timestamp order:
//! - a burst of moves collapses to one `move_mouse` to the final position
//! - press/release pairs on the same button and spot, closer together than
//!   `double_click_window`, merge into one `click` with `count` and `interval`
//! - printable keys typed less than `min_wait` apart become one `send_text`
//!   (a lone character stays a `key`)
//! - an F-key bound in the config becomes `focus_window` and retargets later keys
//! - held modifiers fold into the next key as a chord (`ctrl+c`); shift on
//!   its own only changes the character, so it never breaks a text run
//! - an idle gap longer than `min_wait` becomes a single `wait`
//! - an event identical to a recently seen one (same `t` and data) is a
//!   redelivery and is dropped

use crate::config::RecordingConfig;
use crate::events::{EventData, KeyCode, RawEvent};
use std::collections::VecDeque;
use tracing::trace;
use winseq_core::{Action, ActionSequence, MouseButton, Point, Result, Target};

/// Round to milliseconds so recorded waits stay readable
fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[derive(Debug)]
struct ClickRun {
    button: MouseButton,
    at: Point,
    count: u32,
    first_down: f64,
    last_down: f64,
    last_up: f64,
}

#[derive(Debug)]
struct Press {
    button: MouseButton,
    at: Point,
    t: f64,
    /// Continues the pending click run instead of starting a new one
    merging: bool,
}

/// Chord prefix for a modifier key, in the order chords are written
fn modifier(key: &KeyCode) -> Option<&'static str> {
    let KeyCode::Named(name) = key else {
        return None;
    };
    let base = name
        .strip_suffix("_l")
        .or_else(|| name.strip_suffix("_r"))
        .unwrap_or(name);
    match base {
        "ctrl" | "control" => Some("ctrl"),
        "alt" | "alt_gr" | "option" => Some("alt"),
        "shift" => Some("shift"),
        "cmd" | "command" | "super" | "meta" | "win" => Some("cmd"),
        _ => None,
    }
}

/// How many recent events redeliveries are checked against
const SEEN_WINDOW: usize = 16;

const CHORD_ORDER: [&str; 4] = ["ctrl", "alt", "shift", "cmd"];

#[derive(Debug, Default)]
enum Pending {
    #[default]
    Idle,
    Move(Point),
    Click(ClickRun),
    Text(String),
}

pub struct Coalescer {
    config: RecordingConfig,
    actions: Vec<Action>,
    pending: Pending,
    press: Option<Press>,
    window: Option<String>,
    last_t: Option<f64>,
    held: Vec<&'static str>,
    seen: VecDeque<RawEvent>,
}

impl Coalescer {
    pub fn new(config: RecordingConfig) -> Self {
        let window = config.default_window.clone();
        Self {
            config,
            actions: Vec::new(),
            pending: Pending::Idle,
            press: None,
            window,
            last_t: None,
            held: Vec::new(),
            seen: VecDeque::with_capacity(SEEN_WINDOW),
        }
    }

    pub fn push(&mut self, event: RawEvent) {
        // Sources deliver at least once; the same input never arrives twice with one timestamp
        if self.seen.contains(&event) {
            trace!("duplicate {:?}", event);
            return;
        }
        if self.seen.len() == SEEN_WINDOW {
            self.seen.pop_front();
        }
        self.seen.push_back(event.clone());

        let t = event.t;
        trace!("event {:?}", event);

        match event.data {
            EventData::Move { x, y } => self.on_move(t, Point::new(x, y)),
            EventData::ButtonDown { x, y, b } => self.on_button_down(t, Point::new(x, y), b),
            EventData::ButtonUp { b, .. } => self.on_button_up(t, b),
            EventData::KeyDown { k } => self.on_key_down(t, k),
            EventData::KeyUp { k } => {
                if let Some(m) = modifier(&k) {
                    self.held.retain(|h| *h != m);
                }
            }
        }
    }

    /// Flush partial buffers and hand over the finished sequence
    pub fn finish(mut self) -> Result<ActionSequence> {
        self.flush_pending();
        ActionSequence::new(self.actions)
    }

    fn on_move(&mut self, t: f64, p: Point) {
        // Drags are not modeled; the click lands where the button went down
        if self.press.is_some() {
            return;
        }
        if let Pending::Click(run) = &self.pending {
            if run.at.distance(&p) <= self.config.click_slop {
                return;
            }
        }
        if let Pending::Move(to) = &mut self.pending {
            *to = p;
            self.last_t = Some(t);
            return;
        }
        self.begin(t);
        self.pending = Pending::Move(p);
        self.last_t = Some(t);
    }

    fn on_button_down(&mut self, t: f64, p: Point, button: MouseButton) {
        let merging = self.press.is_none()
            && matches!(&self.pending, Pending::Click(run)
                if run.button == button
                    && run.at.distance(&p) <= self.config.click_slop
                    && t - run.last_up < self.config.double_click_window);

        if !merging {
            self.begin(t);
        }
        self.press = Some(Press {
            button,
            at: p,
            t,
            merging,
        });
        self.last_t = Some(t);
    }

    fn on_button_up(&mut self, t: f64, button: MouseButton) {
        let press = match self.press.take() {
            Some(press) if press.button == button => press,
            other => {
                // Release without a matching press
                self.press = other;
                return;
            }
        };

        match &mut self.pending {
            Pending::Click(run) if press.merging => {
                run.count += 1;
                run.last_down = press.t;
                run.last_up = t;
            }
            _ => {
                self.flush_pending();
                self.pending = Pending::Click(ClickRun {
                    button: press.button,
                    at: press.at,
                    count: 1,
                    first_down: press.t,
                    last_down: press.t,
                    last_up: t,
                });
            }
        }
        self.last_t = Some(t);
    }

    fn on_key_down(&mut self, t: f64, key: KeyCode) {
        if let Some(m) = modifier(&key) {
            if !self.held.contains(&m) {
                self.held.push(m);
            }
            return;
        }

        let chord: Vec<&str> = CHORD_ORDER
            .into_iter()
            .filter(|m| self.held.contains(m))
            .collect();
        let shift_only = chord == ["shift"];
        if !chord.is_empty() && !(shift_only && key.printable().is_some()) {
            let name = match &key {
                KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()).name(),
                other => other.name(),
            };
            self.begin(t);
            self.emit(Action::key(
                format!("{}+{}", chord.join("+"), name),
                self.window.clone(),
            ));
            self.last_t = Some(t);
            return;
        }

        if let KeyCode::Function(n) = key {
            if let Some(window) = self.config.hotkey_window(n).map(str::to_string) {
                self.begin(t);
                self.emit(Action::focus(window.clone()));
                self.window = Some(window);
                self.last_t = Some(t);
                return;
            }
        }

        if let Some(c) = key.printable() {
            let min_wait = self.config.min_wait;
            let last_t = self.last_t;
            if let Pending::Text(buf) = &mut self.pending {
                if last_t.is_some_and(|last| t - last <= min_wait) {
                    buf.push(c);
                    self.last_t = Some(t);
                    return;
                }
            }
            self.begin(t);
            self.pending = Pending::Text(c.to_string());
            self.last_t = Some(t);
            return;
        }

        self.begin(t);
        self.emit(Action::key(key.name(), self.window.clone()));
        self.last_t = Some(t);
    }

    /// Close out whatever is pending, then account for the idle gap before `t`
    fn begin(&mut self, t: f64) {
        self.flush_pending();
        if let Some(last) = self.last_t {
            let gap = t - last;
            if gap > self.config.min_wait {
                self.push_wait(gap);
            }
        }
    }

    fn push_wait(&mut self, gap: f64) {
        if let Some(Action::Wait { seconds }) = self.actions.last_mut() {
            *seconds = round_ms(*seconds + gap);
            return;
        }
        self.emit(Action::Wait {
            seconds: round_ms(gap),
        });
    }

    fn flush_pending(&mut self) {
        match std::mem::take(&mut self.pending) {
            Pending::Idle => {}
            Pending::Move(p) => self.emit(Action::move_to(p)),
            Pending::Click(run) => {
                let interval = if run.count > 1 {
                    round_ms((run.last_down - run.first_down) / (run.count - 1) as f64)
                } else {
                    0.0
                };
                self.emit(Action::Click {
                    to: Some(Target::Point(run.at)),
                    button: run.button,
                    count: run.count,
                    interval: interval.max(0.0),
                });
            }
            Pending::Text(text) => {
                let action = if text.chars().count() == 1 {
                    Action::key(KeyCode::from(text.as_str()).name(), self.window.clone())
                } else {
                    Action::send_text(text, self.window.clone(), false)
                };
                self.emit(action);
            }
        }

        // A press that never saw its release still counts as a click
        if let Some(press) = self.press.take() {
            self.emit(Action::Click {
                to: Some(Target::Point(press.at)),
                button: press.button,
                count: 1,
                interval: 0.0,
            });
        }
    }

    fn emit(&mut self, action: Action) {
        trace!("emit {:?}", action);
        self.actions.push(action);
    }
}
