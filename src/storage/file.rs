//! File-Backed Store
//!
//! Key-value store backed by one file per key under a data directory. The
//! port is infallible by contract, so read failures surface as missing
//! values and write failures are logged rather than propagated.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use step_tutor_core::store::KeyValueStore;
use step_tutor_core::CoreResult;

/// Key-value store persisting each key as a file under `dir`.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> CoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed logical names (no separators), safe as file names.
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(key, %err, "failed to read store entry");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        let path = self.path_for(key);
        if let Err(err) = write_atomic(&path, value) {
            warn!(key, %err, "failed to write store entry");
        }
    }

    fn remove(&self, key: &str) {
        let path = self.path_for(key);
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(key, %err, "failed to remove store entry");
            }
        }
    }
}

/// Write via a sibling temp file and rename so a crash mid-write never
/// leaves a truncated entry.
fn write_atomic(path: &Path, value: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, value)?;
    fs::rename(&tmp, path)
}
