//! Durable key-value storage.
//!
//! The persistence layer only needs the shape of browser local storage:
//! set, get, length and key-at-index. Two implementations are provided:
//! an insertion-ordered in-memory store and a JSON file on disk guarded
//! by file locks.

use crate::{Error, Result};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Key-value storage capability
pub trait KeyValueStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn len(&self) -> Result<usize>;

    /// Key at position `index` in the store's own iteration order
    fn key_at(&self, index: usize) -> Result<Option<String>>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-memory store that iterates keys in insertion order
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.entries.get(index).map(|(k, _)| k.clone()))
    }
}

/// File-backed store: a single JSON object of string values
///
/// Entries are loaded when the store is opened. Every `set` takes an
/// exclusive lock on a sibling `.lock` file, re-reads the file, merges the
/// key in and rewrites it atomically (temp file, fsync, rename), so writers
/// in other processes never drop each other's keys. Keys iterate in sorted
/// order.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`
    ///
    /// A missing file is an empty store. A file that exists but cannot be
    /// parsed is an error: overwriting it would lose every saved workout.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = Self::read_entries(&path)?;
        tracing::debug!("Opened storage {:?} with {} entries", path, entries.len());
        Ok(Self { path, entries })
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            tracing::info!("No storage file at {:?}, starting empty", path);
            return Ok(BTreeMap::new());
        }

        let file = File::open(path)?;
        // Acquire shared lock for reading
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| Error::StorageCorruption {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn parent_dir(&self) -> Result<&Path> {
        self.path
            .parent()
            .ok_or_else(|| Error::Storage(format!("storage path {:?} has no parent", self.path)))
    }

    /// Exclusive lock shared by every writer of this store
    ///
    /// The data file itself is replaced on each write, so the lock lives on
    /// a sibling file that is never renamed.
    fn lock_writers(&self) -> Result<File> {
        std::fs::create_dir_all(self.parent_dir()?)?;

        let mut lock_path = self.path.clone().into_os_string();
        lock_path.push(".lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(PathBuf::from(lock_path))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        // Unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(self.parent_dir()?)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(entries)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let lock = self.lock_writers()?;

        // Pick up keys other processes wrote since this store was opened
        let written = Self::read_entries(&self.path).and_then(|mut entries| {
            entries.insert(key.to_string(), value.to_string());
            self.write_entries(&entries)?;
            Ok(entries)
        });
        lock.unlock()?;

        self.entries = written?;
        tracing::debug!("Wrote key {} to {:?}", key, self.path);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    fn key_at(&self, index: usize) -> Result<Option<String>> {
        Ok(self.entries.keys().nth(index).cloned())
    }
}
