//! Where winseq keeps its files, and the defaults the CLI runs with
//!
//! Home is `$WINSEQ_HOME`, else `$HOME/.winseq`. An optional `config.json`
//! there overrides any of the fields below.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use winseq_core::{FailurePolicy, RunnerConfig};
use winseq_recorder::{RecordingConfig, SequenceStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub on_error: FailurePolicy,
    /// Seconds to wait for a prompted point; absent waits forever
    pub prompt_timeout: Option<f64>,
    pub speed: f64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            on_error: FailurePolicy::Abort,
            prompt_timeout: None,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip)]
    pub home: PathBuf,
    /// Window registry cache, relative paths resolve against home
    pub window_cache: Option<PathBuf>,
    pub sequences_dir: Option<PathBuf>,
    pub index_file: Option<PathBuf>,
    pub run: RunSettings,
    pub recording: RecordingConfig,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let home = match std::env::var_os("WINSEQ_HOME") {
            Some(h) => PathBuf::from(h),
            None => {
                let home = std::env::var_os("HOME").context("HOME not set")?;
                PathBuf::from(home).join(".winseq")
            }
        };
        Self::load_from(home)
    }

    pub fn load_from(home: impl AsRef<Path>) -> Result<Self> {
        let home = home.as_ref().to_path_buf();
        let config = home.join("config.json");

        let mut settings: Settings = if config.exists() {
            let data = fs::read_to_string(&config)?;
            serde_json::from_str(&data)
                .with_context(|| format!("Invalid settings in {}", config.display()))?
        } else {
            Settings::default()
        };
        settings.recording.validate()?;
        settings.home = home;
        debug!("Settings home: {}", settings.home.display());
        Ok(settings)
    }

    fn resolve(&self, p: &Option<PathBuf>, default: &str) -> PathBuf {
        match p {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => self.home.join(p),
            None => self.home.join(default),
        }
    }

    pub fn window_cache(&self) -> PathBuf {
        self.resolve(&self.window_cache, "window_memory.json")
    }

    pub fn sequences_dir(&self) -> PathBuf {
        self.resolve(&self.sequences_dir, "sequences")
    }

    pub fn index_file(&self) -> PathBuf {
        self.resolve(&self.index_file, "sequences_index.json")
    }

    pub fn store(&self) -> SequenceStore {
        SequenceStore::new(self.sequences_dir(), self.index_file())
    }

    pub fn runner_config(&self) -> Result<RunnerConfig> {
        let prompt_timeout = match self.run.prompt_timeout {
            Some(s) => Some(
                Duration::try_from_secs_f64(s)
                    .with_context(|| format!("run.prompt_timeout of {} seconds is invalid", s))?,
            ),
            None => None,
        };
        let config = RunnerConfig {
            on_error: self.run.on_error,
            prompt_timeout,
            speed: self.run.speed,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_live_under_home() {
        let dir = tempdir().unwrap();
        let s = Settings::load_from(dir.path()).unwrap();
        assert_eq!(s.window_cache(), dir.path().join("window_memory.json"));
        assert_eq!(s.sequences_dir(), dir.path().join("sequences"));
        assert_eq!(s.index_file(), dir.path().join("sequences_index.json"));
        assert_eq!(s.runner_config().unwrap().on_error, FailurePolicy::Abort);
        assert_eq!(s.recording.min_wait, 0.25);
    }

    #[test]
    fn config_file_overrides() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{
                "sequences_dir": "/tmp/seqs",
                "window_cache": "windows.json",
                "run": {"on_error": "continue", "prompt_timeout": 2.5},
                "recording": {"focus_hotkeys": [{"fn": 1, "window": "bot"}]}
            }"#,
        )
        .unwrap();

        let s = Settings::load_from(dir.path()).unwrap();
        assert_eq!(s.sequences_dir(), PathBuf::from("/tmp/seqs"));
        assert_eq!(s.window_cache(), dir.path().join("windows.json"));
        let rc = s.runner_config().unwrap();
        assert_eq!(rc.on_error, FailurePolicy::Continue);
        assert_eq!(rc.prompt_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(s.recording.hotkey_window(1), Some("bot"));
    }

    #[test]
    fn bad_hotkey_in_config_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{"recording": {"focus_hotkeys": [{"fn": 15, "window": "bot"}]}}"#,
        )
        .unwrap();
        assert!(Settings::load_from(dir.path()).is_err());
    }

    #[test]
    fn out_of_range_run_settings_are_errors() {
        let dir = tempdir().unwrap();
        for run in [
            r#"{"prompt_timeout": 1e20}"#,
            r#"{"prompt_timeout": -1}"#,
            r#"{"speed": 0}"#,
        ] {
            fs::write(dir.path().join("config.json"), format!(r#"{{"run": {}}}"#, run)).unwrap();
            let s = Settings::load_from(dir.path()).unwrap();
            assert!(s.runner_config().is_err(), "{}", run);
        }
    }
}
