//! Remembered windows - name -> window info, persisted as JSON

use crate::action::Point;
use crate::error::{Error, ErrorCode, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn center(&self) -> Point {
        Point::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowInfo {
    /// Where to click to focus the window, usually its center
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wm_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

impl WindowInfo {
    pub fn at(position: Point) -> Self {
        Self {
            position,
            title: None,
            wm_class: None,
            window_id: None,
            pid: None,
            geometry: None,
            last_used: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_class(mut self, wm_class: impl Into<String>) -> Self {
        self.wm_class = Some(wm_class.into());
        self
    }

    /// Set geometry and move the focus position to its center
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.position = geometry.center();
        self.geometry = Some(geometry);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WindowEntry {
    pub name: String,
    #[serde(flatten)]
    pub info: WindowInfo,
    pub is_last_used: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowRegistry {
    #[serde(default)]
    windows: BTreeMap<String, WindowInfo>,
    #[serde(default)]
    last_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated: Option<DateTime<Utc>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a cache file; a missing file is an empty registry
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let text = fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&text).map_err(|e| {
            Error::new(
                ErrorCode::Io,
                format!("Could not parse window registry {}: {}", path.display(), e),
            )
        })?;
        debug!("loaded {} windows from {}", registry.len(), path.display());
        Ok(registry)
    }

    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        self.updated = Some(Utc::now());
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| Error::new(ErrorCode::Io, e.to_string()))?;
        fs::write(path, text)?;
        debug!("saved {} windows to {}", self.len(), path.display());
        Ok(())
    }

    /// Remember a window under `name`. Returns true if it replaced an existing entry.
    pub fn remember(&mut self, name: &str, mut info: WindowInfo) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_action("Window name cannot be empty"));
        }
        info.last_used = Some(Utc::now());
        let replaced = self.windows.insert(name.to_string(), info).is_some();
        self.last_used = Some(name.to_string());
        Ok(replaced)
    }

    pub fn get(&self, name: &str) -> Option<&WindowInfo> {
        self.windows.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.windows.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Result<WindowInfo> {
        let info = self
            .windows
            .remove(name)
            .ok_or_else(|| Error::window_not_found(name, self.names()))?;
        if self.last_used.as_deref() == Some(name) {
            self.last_used = None;
        }
        Ok(info)
    }

    /// Mark a window as the most recently used one
    pub fn touch(&mut self, name: &str) -> Result<()> {
        let known: Vec<String> = self.windows.keys().cloned().collect();
        let info = self
            .windows
            .get_mut(name)
            .ok_or_else(|| Error::window_not_found(name, known.iter().map(String::as_str)))?;
        info.last_used = Some(Utc::now());
        self.last_used = Some(name.to_string());
        Ok(())
    }

    /// Pick the window an action should go to: the explicit name, else the
    /// last used window, else the first remembered one.
    pub fn resolve_target(&self, name: Option<&str>) -> Result<String> {
        if let Some(name) = name {
            return if self.contains(name) {
                Ok(name.to_string())
            } else {
                Err(Error::window_not_found(name, self.names()))
            };
        }
        if let Some(last) = self.last_used.as_deref().filter(|n| self.contains(n)) {
            return Ok(last.to_string());
        }
        self.windows
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| Error::new(ErrorCode::NotFound, "No windows remembered"))
    }

    pub fn last_used(&self) -> Option<&str> {
        self.last_used.as_deref()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    /// All windows, most recently used first
    pub fn list(&self) -> Vec<WindowEntry> {
        let mut entries: Vec<WindowEntry> = self
            .windows
            .iter()
            .map(|(name, info)| WindowEntry {
                name: name.clone(),
                info: info.clone(),
                is_last_used: self.last_used.as_deref() == Some(name.as_str()),
            })
            .collect();
        entries.sort_by(|a, b| b.info.last_used.cmp(&a.info.last_used));
        entries
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}
