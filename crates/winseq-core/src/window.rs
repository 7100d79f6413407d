//! Collaborator seams - window focus/keystrokes and pointer injection
//!
//! The engine only talks to these traits. Platform backends (xdotool,
//! ydotool, SendInput, CGEvent...) live outside this crate.

use crate::action::{MouseButton, Point};
use crate::error::Result;
use crate::registry::WindowInfo;

/// Focus and keyboard delivery for name-addressable windows
pub trait WindowController: Send + Sync {
    /// Bring a remembered window to the front. Settle delays belong here, not in the engine.
    fn focus(&self, name: &str) -> Result<()>;

    /// Type text into `target`, or the last used window when `None`
    fn send_keys(&self, text: &str, target: Option<&str>) -> Result<()>;

    /// Tap a single named key ("enter", "escape", "tab"...)
    fn send_key(&self, key: &str, target: Option<&str>) -> Result<()>;

    fn window(&self, name: &str) -> Option<WindowInfo>;

    fn last_used_window(&self) -> Option<String>;
}

/// Pointer injection
pub trait InputInjector: Send + Sync {
    fn move_to(&self, point: Point) -> Result<()>;

    /// One press/release of `button` at the current pointer position
    fn click(&self, button: MouseButton) -> Result<()>;
}
