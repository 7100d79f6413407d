//! Action model - a closed set of UI actions that serialize to flat JSON records
//!
//! Each record carries a `type` discriminator plus only the fields of that
//! variant, e.g. `{"type":"click","to":{"var":"p1"},"count":2}`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen coordinates in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Where a pointer action goes: a literal point or a named variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Var { var: String },
    Point(Point),
}

impl Target {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var { var: name.into() }
    }
}

impl From<Point> for Target {
    fn from(p: Point) -> Self {
        Self::Point(p)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
        };
        f.write_str(s)
    }
}

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

fn is_left(b: &MouseButton) -> bool {
    *b == MouseButton::Left
}

fn is_one(n: &u32) -> bool {
    *n == 1
}

/// One unit of UI automation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Bring a remembered window to the front
    FocusWindow { name: String },

    /// Move the pointer without clicking
    MoveMouse { to: Target },

    /// Move the pointer, then pause
    Hover {
        to: Target,
        #[serde(default)]
        seconds: f64,
    },

    /// Click at the current pointer position or at `to`; `count` clicks spaced by `interval` seconds
    Click {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Target>,
        #[serde(default, skip_serializing_if = "is_left")]
        button: MouseButton,
        #[serde(default = "one", skip_serializing_if = "is_one")]
        count: u32,
        #[serde(default, skip_serializing_if = "is_zero")]
        interval: f64,
    },

    /// Type literal text into a window (last used when `window` is absent)
    SendText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<String>,
        #[serde(default = "yes")]
        send_newline: bool,
    },

    /// Send a single named key such as "enter" or "escape"
    Key {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<String>,
    },

    /// Pure delay
    Wait { seconds: f64 },

    /// Block until the caller supplies a point, then bind it to `var`
    PromptPoint {
        var: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        /// Seconds to wait before giving up; falls back to the runner default
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<f64>,
        /// Seconds the user gets to position the pointer before capture starts
        #[serde(default, skip_serializing_if = "Option::is_none")]
        countdown: Option<u32>,
    },
}

impl Action {
    pub fn focus(name: impl Into<String>) -> Self {
        Self::FocusWindow { name: name.into() }
    }

    pub fn move_to(to: impl Into<Target>) -> Self {
        Self::MoveMouse { to: to.into() }
    }

    pub fn wait(seconds: f64) -> Result<Self> {
        let a = Self::Wait { seconds };
        a.validate()?;
        Ok(a)
    }

    pub fn hover(to: impl Into<Target>, seconds: f64) -> Result<Self> {
        let a = Self::Hover {
            to: to.into(),
            seconds,
        };
        a.validate()?;
        Ok(a)
    }

    /// Single left click at the current pointer position
    pub fn click_here() -> Self {
        Self::Click {
            to: None,
            button: MouseButton::Left,
            count: 1,
            interval: 0.0,
        }
    }

    pub fn click(
        to: Option<Target>,
        button: MouseButton,
        count: u32,
        interval: f64,
    ) -> Result<Self> {
        let a = Self::Click {
            to,
            button,
            count,
            interval,
        };
        a.validate()?;
        Ok(a)
    }

    pub fn send_text(text: impl Into<String>, window: Option<String>, send_newline: bool) -> Self {
        Self::SendText {
            text: text.into(),
            window,
            send_newline,
        }
    }

    pub fn key(key: impl Into<String>, window: Option<String>) -> Self {
        Self::Key {
            key: key.into(),
            window,
        }
    }

    pub fn prompt_point(var: impl Into<String>, message: Option<String>) -> Self {
        Self::PromptPoint {
            var: var.into(),
            message,
            timeout: None,
            countdown: None,
        }
    }

    /// The `type` discriminator of this action
    pub fn kind(&self) -> &'static str {
        match self {
            Action::FocusWindow { .. } => "focus_window",
            Action::MoveMouse { .. } => "move_mouse",
            Action::Hover { .. } => "hover",
            Action::Click { .. } => "click",
            Action::SendText { .. } => "send_text",
            Action::Key { .. } => "key",
            Action::Wait { .. } => "wait",
            Action::PromptPoint { .. } => "prompt_point",
        }
    }

    pub fn is_wait(&self) -> bool {
        matches!(self, Action::Wait { .. })
    }

    /// Check field constraints that the type system does not carry
    pub fn validate(&self) -> Result<()> {
        fn duration(field: &str, v: f64) -> Result<()> {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::invalid_action(format!(
                    "{} must be a non-negative number, got {}",
                    field, v
                )));
            }
            if std::time::Duration::try_from_secs_f64(v).is_err() {
                return Err(Error::invalid_action(format!(
                    "{} of {} seconds is out of range",
                    field, v
                )));
            }
            Ok(())
        }

        match self {
            Action::FocusWindow { name } if name.trim().is_empty() => {
                Err(Error::invalid_action("focus_window requires a window name"))
            }
            Action::Hover { seconds, .. } => duration("hover.seconds", *seconds),
            Action::Click {
                count, interval, ..
            } => {
                if *count < 1 {
                    return Err(Error::invalid_action("click.count must be at least 1"));
                }
                duration("click.interval", *interval)
            }
            Action::Key { key, .. } if key.trim().is_empty() => {
                Err(Error::invalid_action("key requires a key name"))
            }
            Action::Wait { seconds } => duration("wait.seconds", *seconds),
            Action::PromptPoint { var, timeout, .. } => {
                if var.trim().is_empty() {
                    return Err(Error::invalid_action("prompt_point requires a var"));
                }
                match timeout {
                    Some(t) => duration("prompt_point.timeout", *t),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

/// Ordered, validated list of actions. Order is the replay order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionSequence {
    actions: Vec<Action>,
}

impl ActionSequence {
    pub fn new(actions: Vec<Action>) -> Result<Self> {
        for (i, a) in actions.iter().enumerate() {
            a.validate()
                .map_err(|e| Error::invalid_action_at(i, e.message))?;
        }
        Ok(Self { actions })
    }

    /// Validate a loosely-typed JSON list before anything runs.
    /// Errors name the index of the first bad record.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let items = value
            .as_array()
            .ok_or_else(|| Error::invalid_action("expected a list of actions"))?;

        let mut actions = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let obj = item
                .as_object()
                .ok_or_else(|| Error::invalid_action_at(i, "expected an object"))?;
            match obj.get("type") {
                Some(serde_json::Value::String(_)) => {}
                Some(_) => return Err(Error::invalid_action_at(i, "'type' must be a string")),
                None => return Err(Error::invalid_action_at(i, "missing 'type'")),
            }
            let action: Action =
                serde_json::from_value(item.clone()).map_err(|e| Error::invalid_action_at(i, e))?;
            action
                .validate()
                .map_err(|e| Error::invalid_action_at(i, e.message))?;
            actions.push(action);
        }

        Ok(Self { actions })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Concatenate, keeping the sequence invariants of both halves
    pub fn concat(&self, other: &ActionSequence) -> Self {
        let mut actions = self.actions.clone();
        actions.extend(other.actions.iter().cloned());
        Self { actions }
    }

    pub fn into_vec(self) -> Vec<Action> {
        self.actions
    }
}

impl TryFrom<Vec<Action>> for ActionSequence {
    type Error = Error;

    fn try_from(actions: Vec<Action>) -> Result<Self> {
        Self::new(actions)
    }
}

impl From<ActionSequence> for Vec<Action> {
    fn from(seq: ActionSequence) -> Self {
        seq.actions
    }
}

impl<'a> IntoIterator for &'a ActionSequence {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn parse_defaults() {
        let seq = ActionSequence::from_json(&json!([
            {"type": "click", "to": {"x": 10, "y": 20}},
            {"type": "send_text", "text": "hi"},
        ]))
        .unwrap();

        assert_eq!(
            seq.actions()[0],
            Action::Click {
                to: Some(Target::Point(Point::new(10.0, 20.0))),
                button: MouseButton::Left,
                count: 1,
                interval: 0.0,
            }
        );
        assert_eq!(seq.actions()[1], Action::send_text("hi", None, true));
    }

    #[test]
    fn var_target_parses() {
        let seq = ActionSequence::from_json(&json!([{"type": "move_mouse", "to": {"var": "p1"}}]))
            .unwrap();
        assert_eq!(seq.actions()[0], Action::move_to(Target::var("p1")));
    }

    #[test]
    fn rejects_missing_type() {
        let err = ActionSequence::from_json(&json!([{"type": "wait", "seconds": 1}, {"seconds": 1}]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAction);
        assert!(err.message.contains("index 1"));
    }

    #[test]
    fn rejects_unknown_type() {
        let err = ActionSequence::from_json(&json!([{"type": "teleport"}])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAction);
        assert!(err.message.contains("index 0"));
    }

    #[test]
    fn rejects_missing_field() {
        let err = ActionSequence::from_json(&json!([{"type": "focus_window"}])).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAction);
    }

    #[test]
    fn rejects_bad_click_values() {
        assert!(Action::click(None, MouseButton::Left, 0, 0.0).is_err());
        assert!(Action::click(None, MouseButton::Left, 2, -0.1).is_err());
        assert!(ActionSequence::from_json(&json!([{"type": "click", "count": -1}])).is_err());
        assert!(Action::wait(-1.0).is_err());
    }

    #[test]
    fn rejects_durations_too_large_to_sleep() {
        let err = ActionSequence::from_json_str(r#"[{"type": "wait", "seconds": 1e20}]"#)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAction);
        assert!(err.message.contains("out of range"));

        for bad in [
            json!([{"type": "hover", "to": {"x": 1, "y": 1}, "seconds": 1e20}]),
            json!([{"type": "click", "count": 2, "interval": 1e20}]),
            json!([{"type": "prompt_point", "var": "p1", "timeout": 1e20}]),
        ] {
            assert!(ActionSequence::from_json(&bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn prompt_point_countdown_is_optional() {
        let seq = ActionSequence::from_json(&json!([
            {"type": "prompt_point", "var": "p1", "countdown": 3},
            {"type": "prompt_point", "var": "p2"},
        ]))
        .unwrap();
        assert!(matches!(
            seq.actions()[0],
            Action::PromptPoint { countdown: Some(3), .. }
        ));
        let v = serde_json::to_value(&seq.actions()[1]).unwrap();
        assert_eq!(v, json!({"type": "prompt_point", "var": "p2"}));
    }

    #[test]
    fn serializes_only_variant_fields() {
        let v = serde_json::to_value(Action::click_here()).unwrap();
        assert_eq!(v, json!({"type": "click"}));

        let v = serde_json::to_value(Action::key("enter", Some("editor".into()))).unwrap();
        assert_eq!(v, json!({"type": "key", "key": "enter", "window": "editor"}));
    }

    #[test]
    fn sequence_roundtrip() {
        let seq = ActionSequence::new(vec![
            Action::focus("editor"),
            Action::hover(Point::new(1.0, 2.0), 0.5).unwrap(),
            Action::click(Some(Target::var("p1")), MouseButton::Right, 3, 0.1).unwrap(),
            Action::send_text("hello", Some("editor".into()), false),
            Action::key("escape", None),
            Action::wait(1.25).unwrap(),
            Action::prompt_point("p2", Some("click the save button".into())),
        ])
        .unwrap();

        let text = serde_json::to_string(&seq).unwrap();
        let back: ActionSequence = serde_json::from_str(&text).unwrap();
        assert_eq!(seq, back);
    }
}
