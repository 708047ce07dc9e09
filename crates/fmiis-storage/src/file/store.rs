//! Local filesystem store provider.
//!
//! Each key is one `<key>.json` file under the root directory. Writes go
//! through a temporary file and a rename so a crash never leaves a
//! half-written record behind.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use fmiis_core::error::{AppError, ErrorKind};
use fmiis_core::result::AppResult;
use fmiis_core::traits::store::DurableStore;

use crate::keys;

/// File-backed store provider.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory holding one file per key.
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root_path`, creating the directory if needed.
    pub fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create store directory: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to its file path, rejecting unsafe keys.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        if !keys::is_valid_key(key) {
            return Err(AppError::validation(format!("Invalid store key: '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.resolve(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read store entry: {key}"),
                e,
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        let tmp = self.root.join(format!(".{key}.json.tmp"));

        fs::write(&tmp, value).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write store entry: {key}"),
                e,
            )
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to commit store entry: {key}"),
                e,
            )
        })?;

        debug!(key, bytes = value.len(), "Wrote store entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove store entry: {key}"),
                e,
            )),
        }
    }

    fn provider_type(&self) -> &str {
        "file"
    }
}
