//! Named sequence storage - one pretty JSON array per sequence plus an index
//!
//! Index layout (`sequences_index.json`):
//! `{"sequences": {"<name>": {"file": "...", "created": "...", "updated": "..."}}, "updated": "..."}`

use crate::session::Recorder;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use winseq_core::ActionSequence;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub file: PathBuf,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SequenceIndex {
    #[serde(default)]
    sequences: BTreeMap<String, IndexEntry>,
    updated: DateTime<Utc>,
}

impl Default for SequenceIndex {
    fn default() -> Self {
        Self {
            sequences: BTreeMap::new(),
            updated: Utc::now(),
        }
    }
}

/// Result of a save
#[derive(Debug, Clone, Serialize)]
pub struct SavedSequence {
    pub name: String,
    pub file: PathBuf,
    /// Number of actions in the file, if it holds a readable sequence
    pub count: Option<usize>,
}

/// One row of `list`
#[derive(Debug, Clone, Serialize)]
pub struct SequenceListing {
    pub name: String,
    pub file: PathBuf,
    pub exists: bool,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

pub struct SequenceStore {
    dir: PathBuf,
    index_file: PathBuf,
}

impl SequenceStore {
    pub fn new(dir: impl Into<PathBuf>, index_file: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index_file: index_file.into(),
        }
    }

    /// Store with the index kept next to the sequence files
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let index_file = dir.join("sequences_index.json");
        Self { dir, index_file }
    }

    /// Save `actions` under `name` and update the index.
    ///
    /// Without `file` the sequence goes to `<dir>/<slug>.json`; an existing file
    /// gets a `-2`, `-3`... suffix unless `overwrite`. With `file` and no
    /// actions, an existing file is registered as is.
    pub fn save(
        &self,
        name: &str,
        actions: Option<&ActionSequence>,
        file: Option<&Path>,
        overwrite: bool,
    ) -> Result<SavedSequence> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Name is required");
        }
        if actions.is_none() && file.is_none() {
            bail!("No actions provided and no recent recording available");
        }

        let path = match file {
            Some(p) => p.to_path_buf(),
            None => self.free_path(&slugify(name), overwrite)?,
        };

        if let Some(seq) = actions {
            write_file(&path, seq, false)?;
        }

        let mut index = self.load_index();
        let now = Utc::now();
        index
            .sequences
            .entry(name.to_string())
            .and_modify(|e| {
                e.file = path.clone();
                e.updated = now;
            })
            .or_insert_with(|| IndexEntry {
                file: path.clone(),
                created: now,
                updated: now,
            });
        self.save_index(&mut index)?;

        let count = read_file(&path).ok().map(|s| s.len());
        debug!("Saved sequence '{}' to {}", name, path.display());
        Ok(SavedSequence {
            name: name.to_string(),
            file: path,
            count,
        })
    }

    /// Save the recorder's last finished sequence
    pub fn save_last(&self, name: &str, recorder: &Recorder, overwrite: bool) -> Result<SavedSequence> {
        let last = recorder.last_recorded();
        self.save(name, last.as_ref(), None, overwrite)
    }

    /// Most recently updated first
    pub fn list(&self) -> Vec<SequenceListing> {
        let index = self.load_index();
        let mut out: Vec<SequenceListing> = index
            .sequences
            .into_iter()
            .map(|(name, e)| SequenceListing {
                exists: e.file.exists(),
                name,
                file: e.file,
                created: e.created,
                updated: e.updated,
            })
            .collect();
        out.sort_by(|a, b| b.updated.cmp(&a.updated));
        out
    }

    pub fn entry(&self, name: &str) -> Option<IndexEntry> {
        self.load_index().sequences.remove(name)
    }

    pub fn load(&self, name: &str) -> Result<ActionSequence> {
        let entry = self
            .entry(name)
            .with_context(|| format!("No sequence named '{}'", name))?;
        read_file(&entry.file)
    }

    /// Drop `name` from the index; returns the removed file when `remove_file`
    pub fn delete(&self, name: &str, remove_file: bool) -> Result<Option<PathBuf>> {
        let mut index = self.load_index();
        let Some(entry) = index.sequences.remove(name) else {
            bail!("No sequence named '{}'", name);
        };
        self.save_index(&mut index)?;

        if !remove_file {
            return Ok(None);
        }
        if entry.file.exists() {
            fs::remove_file(&entry.file)
                .with_context(|| format!("Failed to delete {}", entry.file.display()))?;
        }
        Ok(Some(entry.file))
    }

    fn free_path(&self, slug: &str, overwrite: bool) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", slug));
        if overwrite || !path.exists() {
            return Ok(path);
        }
        let mut i = 2;
        loop {
            let candidate = self.dir.join(format!("{}-{}.json", slug, i));
            if !candidate.exists() {
                return Ok(candidate);
            }
            i += 1;
        }
    }

    fn load_index(&self) -> SequenceIndex {
        let data = match fs::read_to_string(&self.index_file) {
            Ok(d) => d,
            Err(_) => return SequenceIndex::default(),
        };
        serde_json::from_str(&data).unwrap_or_else(|e| {
            warn!("Ignoring unreadable index {}: {}", self.index_file.display(), e);
            SequenceIndex::default()
        })
    }

    fn save_index(&self, index: &mut SequenceIndex) -> Result<()> {
        if let Some(parent) = self.index_file.parent() {
            fs::create_dir_all(parent)?;
        }
        index.updated = Utc::now();
        fs::write(&self.index_file, serde_json::to_string_pretty(index)?)
            .with_context(|| format!("Failed to write {}", self.index_file.display()))?;
        Ok(())
    }
}

/// Write a sequence as a pretty JSON array; `append` concatenates onto an
/// existing array file
pub fn write_file(path: impl AsRef<Path>, seq: &ActionSequence, append: bool) -> Result<usize> {
    let path = path.as_ref();
    let seq = if append && path.exists() {
        read_file(path)
            .with_context(|| format!("Cannot append to {}", path.display()))?
            .concat(seq)
    } else {
        seq.clone()
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&seq)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(seq.len())
}

pub fn read_file(path: impl AsRef<Path>) -> Result<ActionSequence> {
    let path = path.as_ref();
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(ActionSequence::from_json_str(&data)?)
}

/// Lowercase, keep `[a-z0-9-_.]`, spaces become dashes
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | ' '))
        .collect();
    let slug = kept.split_whitespace().collect::<Vec<_>>().join("-");
    if slug.is_empty() {
        "sequence".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use winseq_core::{Action, Point};

    fn sample() -> ActionSequence {
        ActionSequence::new(vec![
            Action::focus("editor"),
            Action::move_to(Point::new(1.0, 2.0)),
        ])
        .unwrap()
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("  Open Mail  "), "open-mail");
        assert_eq!(slugify("Ünïcode!!"), "ncode");
        assert_eq!(slugify("***"), "sequence");
        assert_eq!(slugify("v1.2_final"), "v1.2_final");
    }

    #[test]
    fn save_list_load_delete() {
        let dir = tempdir().unwrap();
        let store = SequenceStore::with_dir(dir.path());

        let saved = store.save("Open Mail", Some(&sample()), None, false).unwrap();
        assert_eq!(saved.file, dir.path().join("open-mail.json"));
        assert_eq!(saved.count, Some(2));

        let list = store.list();
        assert_eq!(list.len(), 1);
        assert!(list[0].exists);
        assert_eq!(store.load("Open Mail").unwrap(), sample());

        let removed = store.delete("Open Mail", true).unwrap();
        assert_eq!(removed, Some(saved.file.clone()));
        assert!(!saved.file.exists());
        assert!(store.list().is_empty());
        assert!(store.load("Open Mail").is_err());
        assert!(store.delete("Open Mail", true).is_err());
    }

    #[test]
    fn unique_suffix_unless_overwrite() {
        let dir = tempdir().unwrap();
        let store = SequenceStore::with_dir(dir.path());
        let a = store.save("login", Some(&sample()), None, false).unwrap();
        let b = store.save("login again", Some(&sample()), None, false).unwrap();
        let c = store.save("Login", Some(&sample()), None, false).unwrap();
        assert_eq!(a.file, dir.path().join("login.json"));
        assert_eq!(b.file, dir.path().join("login-again.json"));
        assert_eq!(c.file, dir.path().join("login-2.json"));

        let d = store.save("Login", Some(&sample()), None, true).unwrap();
        assert_eq!(d.file, dir.path().join("login.json"));
        // Re-saving keeps the original created stamp
        let entry = store.entry("Login").unwrap();
        assert!(entry.created <= entry.updated);
    }

    #[test]
    fn save_requires_actions_or_file() {
        let dir = tempdir().unwrap();
        let store = SequenceStore::with_dir(dir.path());
        assert!(store.save("x", None, None, false).is_err());
        assert!(store.save("  ", Some(&sample()), None, false).is_err());

        let external = dir.path().join("ext.json");
        write_file(&external, &sample(), false).unwrap();
        let saved = store.save("ext", None, Some(&external), false).unwrap();
        assert_eq!(saved.count, Some(2));
    }

    #[test]
    fn append_concatenates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/seq.json");
        assert_eq!(write_file(&path, &sample(), true).unwrap(), 2);
        assert_eq!(write_file(&path, &sample(), true).unwrap(), 4);
        assert_eq!(read_file(&path).unwrap().len(), 4);

        fs::write(&path, r#"{"not": "a list"}"#).unwrap();
        assert!(write_file(&path, &sample(), true).is_err());
    }

    #[test]
    fn corrupt_index_reads_empty() {
        let dir = tempdir().unwrap();
        let store = SequenceStore::with_dir(dir.path());
        fs::write(dir.path().join("sequences_index.json"), "not json").unwrap();
        assert!(store.list().is_empty());
        store.save("a", Some(&sample()), None, false).unwrap();
        assert_eq!(store.list().len(), 1);
    }
}
