use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory {0:?} missing or not writable: {1}")]
    Directory(PathBuf, String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the directory exists; create it if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::Directory(dir.into(), e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::Directory(
                dir.into(),
                "path is not a directory".into(),
            ));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::Directory(dir.into(), e.to_string()))?;
    }
    Ok(())
}

/// Write `content` to `target` through a synced temp file in the same directory,
/// then rename over the target. Readers see either the old or the new content.
pub fn write_atomic(target: &Path, content: &str) -> Result<(), PersistError> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_dir(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
    Ok(())
}
