use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::persist::{write_atomic, PersistError};

/// Single-value store for the id of the last successfully processed item.
pub trait WatermarkStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, PersistError>;
    fn store(&self, id: &str) -> Result<(), PersistError>;
}

/// Watermark kept as the only line of a small text file.
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WatermarkStore for FileWatermarkStore {
    fn load(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, id: &str) -> Result<(), PersistError> {
        write_atomic(&self.path, id)
    }
}
