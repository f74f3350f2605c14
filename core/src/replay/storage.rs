//! Replay directory
//!
//! Saves, loads and lists `.valreplay` files in a single flat directory.
//! The directory is created on demand when the first replay is saved.

use std::fs;
use std::path::{Path, PathBuf};

use crate::replay::binary::{self, BinaryWriter};
use crate::replay::error::{ReplayError, Result};
use crate::replay::types::{FORMAT_VERSION, REPLAY_EXTENSION, ReplayFile};

/// A saved replay as listed on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    /// File stem (name without the extension)
    pub name: String,
    /// File size in bytes
    pub size: u64,
}

impl ReplayEntry {
    /// Size in whole kibibytes, rounded down
    pub fn size_kb(&self) -> u64 {
        self.size / 1024
    }
}

/// Replay files under one directory
#[derive(Debug, Clone)]
pub struct ReplayStore {
    dir: PathBuf,
}

impl ReplayStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a replay called `name` is saved to
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{REPLAY_EXTENSION}"))
    }

    /// Write `replay` as `<name>.valreplay`, creating the directory if needed
    pub fn save(&self, name: &str, replay: &ReplayFile) -> Result<PathBuf> {
        self.save_version(name, replay, FORMAT_VERSION)
    }

    /// Like [`save`](Self::save), but in the layout of an older format `version`
    pub fn save_version(&self, name: &str, replay: &ReplayFile, version: i32) -> Result<PathBuf> {
        validate_name(name)?;
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(name);
        let mut bytes = Vec::new();
        BinaryWriter::with_version(&mut bytes, version).write_replay(replay)?;
        fs::write(&path, &bytes)?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), version, "replay saved");
        Ok(path)
    }

    /// Read a replay by name, with or without the extension
    pub fn load(&self, name: &str) -> Result<ReplayFile> {
        let path = self.resolve(name)?;
        let bytes = fs::read(&path)?;
        let replay = binary::decode(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            version = replay.version,
            frames = replay.frames.len(),
            "replay loaded"
        );
        Ok(replay)
    }

    /// Locate an existing file: `<name>.valreplay` first, then `name` as given
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        let with_extension = self.path_for(name);
        if with_extension.is_file() {
            return Ok(with_extension);
        }
        let exact = self.dir.join(name);
        if exact.is_file() {
            return Ok(exact);
        }
        Err(ReplayError::ReplayNotFound(name.to_string()))
    }

    /// Saved replays sorted by name; a missing directory lists as empty
    pub fn list(&self) -> Result<Vec<ReplayEntry>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut replays = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(REPLAY_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            replays.push(ReplayEntry {
                name: name.to_string(),
                size: metadata.len(),
            });
        }

        replays.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(replays)
    }

    /// Names of saved replays, for command completion
    pub fn names(&self) -> Vec<String> {
        match self.list() {
            Ok(entries) => entries.into_iter().map(|e| e.name).collect(),
            Err(e) => {
                tracing::debug!(error = %e, "cannot list replays");
                Vec::new()
            }
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if bad {
        return Err(ReplayError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::types::ReplayFrame;

    fn sample() -> ReplayFile {
        let mut replay = ReplayFile::new(1_700_000_000);
        replay.duration = 1.5;
        replay.frames.push(ReplayFrame::new(0.0));
        replay.frames.push(ReplayFrame::new(1.5));
        replay
    }

    #[test]
    fn test_save_creates_directory_and_loads_back() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path().join("cameraTools").join("replays"));

        let path = store.save("run1", &sample()).unwrap();
        assert!(path.ends_with("run1.valreplay"));
        assert!(path.is_file());

        assert_eq!(store.load("run1").unwrap(), sample());
        assert_eq!(store.load("run1.valreplay").unwrap(), sample());
    }

    #[test]
    fn test_load_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path());
        assert!(matches!(
            store.load("nope"),
            Err(ReplayError::ReplayNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_load_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path());
        fs::write(store.path_for("junk"), b"not a replay").unwrap();
        assert!(matches!(
            store.load("junk"),
            Err(ReplayError::CorruptFormat(_))
        ));
    }

    #[test]
    fn test_list_sorted_with_sizes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path());
        assert!(store.list().unwrap().is_empty());

        store.save("b", &sample()).unwrap();
        store.save("a", &sample()).unwrap();
        fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();

        let listed = store.list().unwrap();
        let names: Vec<_> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        let expected = binary::encode(&sample()).unwrap().len() as u64;
        assert_eq!(listed[0].size, expected);
        assert_eq!(listed[0].size_kb(), 0);
        assert_eq!(store.names(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_directory_lists_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
        assert!(store.names().is_empty());
    }

    #[test]
    fn test_save_older_version() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path());

        store.save_version("legacy", &sample(), 1).unwrap();
        let loaded = store.load("legacy").unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.frames, sample().frames);
    }

    #[test]
    fn test_rejects_path_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ReplayStore::new(tmp.path());
        for name in ["", "..", "../escape", "a/b", "a\\b"] {
            assert!(
                matches!(store.save(name, &sample()), Err(ReplayError::InvalidName(_))),
                "{name:?}"
            );
        }
    }
}
