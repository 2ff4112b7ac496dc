//! Durable key-value stores for cache snapshots.

use crate::config::StorageConfig;
use crate::error::{Error, Result};

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// A string key-value store, shaped like browser local storage.
pub trait SnapshotStore: Send + Sync + Debug {
  fn get_item(&self, key: &str) -> Result<Option<String>>;
  fn set_item(&self, key: &str, value: &str) -> Result<()>;
  fn remove_item(&self, key: &str) -> Result<()>;
}

/// Opens the store described by `config`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn SnapshotStore>> {
  match config {
    StorageConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    StorageConfig::File { directory } => Ok(Arc::new(FileStore::open(directory)?)),
  }
}

/// An in-process store. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
  items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.items.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.lock().is_empty()
  }
}

impl SnapshotStore for MemoryStore {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    Ok(self.items.lock().get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    self.items.lock().insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    self.items.lock().remove(key);
    Ok(())
  }
}

/// Keeps each item in `<directory>/<key>.json`.
///
/// Writes go through a temporary file and a rename, so a crash never leaves
/// a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileStore {
  directory: PathBuf,
}

impl FileStore {
  /// Creates `directory` if needed.
  pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
    let directory = directory.as_ref().to_path_buf();
    fs::create_dir_all(&directory).map_err(|source| Error::Storage {
      key: directory.display().to_string(),
      source,
    })?;
    Ok(Self { directory })
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  fn path_for(&self, key: &str) -> Result<PathBuf> {
    let valid = !key.is_empty()
      && key != "."
      && key != ".."
      && key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !valid {
      return Err(Error::Storage {
        key: key.to_string(),
        source: io::Error::new(io::ErrorKind::InvalidInput, "key is not a valid file name"),
      });
    }
    Ok(self.directory.join(format!("{}.json", key)))
  }
}

impl SnapshotStore for FileStore {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key)?;
    match fs::read_to_string(&path) {
      Ok(contents) => Ok(Some(contents)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(Error::Storage {
        key: key.to_string(),
        source,
      }),
    }
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let path = self.path_for(key)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, value)
      .and_then(|_| fs::rename(&staging, &path))
      .map_err(|source| Error::Storage {
        key: key.to_string(),
        source,
      })
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let path = self.path_for(key)?;
    match fs::remove_file(&path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(Error::Storage {
        key: key.to_string(),
        source,
      }),
    }
  }
}
