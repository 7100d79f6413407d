//! Dry-run desktop - a window controller and input injector that resolves
//! everything against the window registry but only logs what it would do
//!
//! Useful for checking sequences before pointing them at a real backend, and
//! as the default backend of the CLI.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::info;
use winseq_core::{
    InputInjector, MouseButton, Point, Result, WindowController, WindowInfo, WindowRegistry,
};

pub struct DryRunDesktop {
    registry: Mutex<WindowRegistry>,
    path: Option<PathBuf>,
    pointer: Mutex<Option<Point>>,
    journal: Mutex<Vec<String>>,
}

impl DryRunDesktop {
    pub fn new(registry: WindowRegistry) -> Self {
        Self {
            registry: Mutex::new(registry),
            path: None,
            pointer: Mutex::new(None),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Load the registry from `path`; `persist` writes focus changes back there
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let registry = WindowRegistry::load(&path)?;
        let mut desktop = Self::new(registry);
        desktop.path = Some(path);
        Ok(desktop)
    }

    pub fn persist(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.registry.lock().save(path),
            None => Ok(()),
        }
    }

    pub fn pointer(&self) -> Option<Point> {
        *self.pointer.lock()
    }

    /// Everything performed so far, one line per collaborator call
    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }

    fn record(&self, line: String) {
        info!("[dry-run] {}", line);
        self.journal.lock().push(line);
    }
}

impl WindowController for DryRunDesktop {
    fn focus(&self, name: &str) -> Result<()> {
        self.registry.lock().touch(name)?;
        self.record(format!("focus {}", name));
        Ok(())
    }

    fn send_keys(&self, text: &str, target: Option<&str>) -> Result<()> {
        let window = self.registry.lock().resolve_target(target)?;
        self.record(format!("type {:?} into {}", text, window));
        Ok(())
    }

    fn send_key(&self, key: &str, target: Option<&str>) -> Result<()> {
        let window = self.registry.lock().resolve_target(target)?;
        self.record(format!("key {} into {}", key, window));
        Ok(())
    }

    fn window(&self, name: &str) -> Option<WindowInfo> {
        self.registry.lock().get(name).cloned()
    }

    fn last_used_window(&self) -> Option<String> {
        self.registry.lock().last_used().map(str::to_string)
    }
}

impl InputInjector for DryRunDesktop {
    fn move_to(&self, point: Point) -> Result<()> {
        *self.pointer.lock() = Some(point);
        self.record(format!("move to {}", point));
        Ok(())
    }

    fn click(&self, button: MouseButton) -> Result<()> {
        let at = self
            .pointer()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "current position".to_string());
        self.record(format!("click {} at {}", button, at));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use winseq_core::{ActionSequence, ErrorCode, Runner, Target, Variables};

    fn desktop_with(names: &[&str]) -> DryRunDesktop {
        let mut reg = WindowRegistry::new();
        for (i, n) in names.iter().enumerate() {
            reg.remember(n, WindowInfo::at(Point::new(i as f64 * 100.0, 0.0)))
                .unwrap();
        }
        DryRunDesktop::new(reg)
    }

    #[test]
    fn focus_unknown_window_fails() {
        let d = desktop_with(&["editor"]);
        let err = d.focus("mail").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(d.journal().is_empty());
    }

    #[test]
    fn keys_go_to_last_used_window() {
        let d = desktop_with(&["editor", "term"]);
        d.focus("editor").unwrap();
        d.send_keys("hi", None).unwrap();
        d.send_key("enter", Some("term")).unwrap();
        assert_eq!(
            d.journal(),
            vec![
                "focus editor".to_string(),
                "type \"hi\" into editor".to_string(),
                "key enter into term".to_string(),
            ]
        );
        assert_eq!(d.last_used_window().as_deref(), Some("editor"));
    }

    #[test]
    fn runs_sequence_and_persists_focus() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("window_memory.json");
        let mut reg = WindowRegistry::new();
        reg.remember("editor", WindowInfo::at(Point::new(0.0, 0.0)))
            .unwrap();
        reg.remember("term", WindowInfo::at(Point::new(5.0, 5.0)))
            .unwrap();
        reg.save(&path).unwrap();

        let d = DryRunDesktop::open(&path).unwrap();
        let seq = ActionSequence::from_json_str(
            r#"[
                {"type": "focus_window", "name": "editor"},
                {"type": "click", "to": {"var": "ok"}, "count": 2}
            ]"#,
        )
        .unwrap();
        let vars = Variables::new().with("ok", Point::new(40.0, 50.0));
        let report = Runner::new(&d, &d).run(&seq, vars);
        assert!(report.success);
        assert_eq!(d.pointer(), Some(Point::new(40.0, 50.0)));
        d.persist().unwrap();

        let reloaded = WindowRegistry::load(&path).unwrap();
        assert_eq!(reloaded.last_used(), Some("editor"));

        // A sequence naming a missing variable stops at that step
        let seq = ActionSequence::new(vec![winseq_core::Action::move_to(Target::var("nope"))])
            .unwrap();
        let report = Runner::new(&d, &d).run(&seq, Variables::new());
        assert_eq!(report.failed_at, Some(0));
    }
}
