//! Write-then-rename file persistence.
//!
//! The existence check treats *any* file at a derived path as a finished
//! conversion, so nothing may appear at a final path before its content is
//! complete. [`write_atomic`] writes into a hidden temporary file in the
//! destination directory, fsyncs it, and renames it over the final path.
//! A crash leaves at worst a stray `.*.partial` file, never a truncated
//! output under the real name.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure persisting a buffer. Each variant names the step that failed.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("create directory structure '{}': {source}", path.display())]
    DirectoryCreate { path: PathBuf, source: io::Error },
    #[error("create file '{}': {source}", path.display())]
    FileCreate { path: PathBuf, source: io::Error },
    #[error("write file '{}': {source}", path.display())]
    FileWrite { path: PathBuf, source: io::Error },
    #[error("close file '{}': {source}", path.display())]
    FileClose { path: PathBuf, source: io::Error },
}

/// Persist `bytes` at `path`, creating missing parent directories.
///
/// The rename is atomic on the same filesystem; an existing file at `path`
/// is replaced.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir).map_err(|source| WriteError::DirectoryCreate {
        path: dir.clone(),
        source,
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(&dir)
        .map_err(|source| WriteError::FileCreate {
            path: path.to_path_buf(),
            source,
        })?;

    tmp.write_all(bytes)
        .and_then(|()| tmp.flush())
        .map_err(|source| WriteError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;

    // A failed fsync may mean the data never reached the disk
    tmp.as_file()
        .sync_all()
        .map_err(|source| WriteError::FileClose {
            path: path.to_path_buf(),
            source,
        })?;

    tmp.persist(path).map_err(|e| WriteError::FileClose {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
