//! Recording configuration

use serde::{Deserialize, Serialize};
use winseq_core::{Error, Result};

/// F-key bound to a window during recording: pressing it inserts `focus_window`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusHotkey {
    /// Function key number, 1..=12 for F1..F12
    #[serde(rename = "fn")]
    pub key: u8,
    pub window: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Window attached to recorded send_text/key actions until a hotkey switches it
    pub default_window: Option<String>,
    pub focus_hotkeys: Vec<FocusHotkey>,
    /// Insert a wait when the idle gap exceeds this many seconds
    pub min_wait: f64,
    /// Merge clicks closer than this many seconds
    pub double_click_window: f64,
    /// Max pointer drift (px) for clicks to count as the same spot
    pub click_slop: f64,
    /// Max events queued between the capture source and the coalescer
    pub max_buffer: usize,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            default_window: None,
            focus_hotkeys: Vec::new(),
            min_wait: 0.25,
            double_click_window: 0.35,
            click_slop: 4.0,
            max_buffer: 10000,
        }
    }
}

impl RecordingConfig {
    pub fn default_window(mut self, window: impl Into<String>) -> Self {
        self.default_window = Some(window.into());
        self
    }

    /// Bind F`key` to `window`, replacing any earlier binding of the same key
    pub fn hotkey(mut self, key: u8, window: impl Into<String>) -> Self {
        self.focus_hotkeys.retain(|h| h.key != key);
        self.focus_hotkeys.push(FocusHotkey {
            key,
            window: window.into(),
        });
        self
    }

    pub fn min_wait(mut self, seconds: f64) -> Self {
        self.min_wait = seconds;
        self
    }

    pub fn double_click_window(mut self, seconds: f64) -> Self {
        self.double_click_window = seconds;
        self
    }

    pub fn hotkey_window(&self, key: u8) -> Option<&str> {
        self.focus_hotkeys
            .iter()
            .find(|h| h.key == key)
            .map(|h| h.window.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        for h in &self.focus_hotkeys {
            if !(1..=12).contains(&h.key) {
                return Err(Error::invalid_action(format!(
                    "focus hotkey F{} out of range (F1..F12)",
                    h.key
                )));
            }
            if h.window.trim().is_empty() {
                return Err(Error::invalid_action(format!(
                    "focus hotkey F{} has no window",
                    h.key
                )));
            }
        }
        for (field, v) in [
            ("min_wait", self.min_wait),
            ("double_click_window", self.double_click_window),
            ("click_slop", self.click_slop),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::invalid_action(format!(
                    "{} must be a non-negative number, got {}",
                    field, v
                )));
            }
        }
        if self.max_buffer == 0 {
            return Err(Error::invalid_action("max_buffer must be at least 1"));
        }
        Ok(())
    }
}
