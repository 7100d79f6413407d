//! Raw input events - what a capture source pushes while recording
//!
//! Events serialize to compact JSON lines, e.g.
//! `{"t":0.1,"e":"button_down","x":10,"y":10}` or `{"t":2.0,"e":"key_down","k":"a"}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use winseq_core::{MouseButton, Point};

/// Single event - flat structure for efficiency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Seconds on a monotonic clock
    pub t: f64,
    #[serde(flatten)]
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "e", rename_all = "snake_case")]
pub enum EventData {
    Move {
        x: f64,
        y: f64,
    },
    ButtonDown {
        x: f64,
        y: f64,
        #[serde(default)]
        b: MouseButton,
    },
    ButtonUp {
        x: f64,
        y: f64,
        #[serde(default)]
        b: MouseButton,
    },
    KeyDown {
        k: KeyCode,
    },
    KeyUp {
        k: KeyCode,
    },
}

impl RawEvent {
    pub fn moved(t: f64, x: f64, y: f64) -> Self {
        Self {
            t,
            data: EventData::Move { x, y },
        }
    }

    pub fn button_down(t: f64, x: f64, y: f64, b: MouseButton) -> Self {
        Self {
            t,
            data: EventData::ButtonDown { x, y, b },
        }
    }

    pub fn button_up(t: f64, x: f64, y: f64, b: MouseButton) -> Self {
        Self {
            t,
            data: EventData::ButtonUp { x, y, b },
        }
    }

    pub fn key_down(t: f64, k: impl Into<KeyCode>) -> Self {
        Self {
            t,
            data: EventData::KeyDown { k: k.into() },
        }
    }

    pub fn key_up(t: f64, k: impl Into<KeyCode>) -> Self {
        Self {
            t,
            data: EventData::KeyUp { k: k.into() },
        }
    }

    /// Pointer position carried by mouse events
    pub fn point(&self) -> Option<Point> {
        match self.data {
            EventData::Move { x, y }
            | EventData::ButtonDown { x, y, .. }
            | EventData::ButtonUp { x, y, .. } => Some(Point::new(x, y)),
            _ => None,
        }
    }
}

/// Key identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyCode {
    /// A character key ("a", "A", "1", " ")
    Char(char),
    /// F1..F24
    Function(u8),
    /// Everything else, lowercased ("enter", "escape", "shift")
    Named(String),
}

impl KeyCode {
    pub fn parse(s: &str) -> Self {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return KeyCode::Char(c);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(n) = lower
            .strip_prefix('f')
            .and_then(|rest| rest.parse::<u8>().ok())
            .filter(|n| (1..=24).contains(n))
        {
            return KeyCode::Function(n);
        }

        match lower.as_str() {
            "return" => KeyCode::Named("enter".to_string()),
            "esc" => KeyCode::Named("escape".to_string()),
            "space" => KeyCode::Char(' '),
            _ => KeyCode::Named(lower),
        }
    }

    /// The character this key types, if it types one
    pub fn printable(&self) -> Option<char> {
        match self {
            KeyCode::Char(c) if !c.is_control() => Some(*c),
            _ => None,
        }
    }

    pub fn name(&self) -> String {
        match self {
            KeyCode::Char(' ') => "space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Function(n) => format!("f{}", n),
            KeyCode::Named(s) => s.clone(),
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<String> for KeyCode {
    fn from(s: String) -> Self {
        KeyCode::parse(&s)
    }
}

impl From<&str> for KeyCode {
    fn from(s: &str) -> Self {
        KeyCode::parse(s)
    }
}

impl From<char> for KeyCode {
    fn from(c: char) -> Self {
        KeyCode::Char(c)
    }
}

impl From<KeyCode> for String {
    fn from(k: KeyCode) -> Self {
        k.name()
    }
}
