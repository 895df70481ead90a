//! Path scheme for sources and derived images.
//!
//! Sources live at `<root>/<source_path>`. Derived images mirror the source
//! directory under `<root>/processed/` and are named after the item id:
//!
//! ```text
//! root/a/b/IMG_0042.jpg   (item "p1")  →  root/processed/a/b/p1.webp
//! ```
//!
//! The existence check and the writer both compute paths through
//! [`OutputLayout`], so a rerun always looks where the previous run wrote.
//!
//! Catalog rows are untrusted text; [`normalize_source_path`] and
//! [`validate_item_id`] reject values that would resolve outside the root.

use crate::imaging::OutputFormat;
use crate::types::WorkItem;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Directory under the root that receives every derived image.
pub const PROCESSED_DIR: &str = "processed";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    #[error("empty source path")]
    EmptySourcePath,
    #[error("source path '{0}' escapes the catalog root")]
    EscapingSourcePath(String),
    #[error("empty item id")]
    EmptyItemId,
    #[error("item id '{0}' contains a path separator")]
    ItemIdWithSeparator(String),
}

/// Resolves source and derived paths for work items under one root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    format: OutputFormat,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    /// `<root>/<source_path>`
    pub fn source_path(&self, item: &WorkItem) -> PathBuf {
        self.root.join(&item.source_path)
    }

    /// `<root>/processed/<source dir>/<item_id>.<ext>`
    pub fn derived_path(&self, item: &WorkItem) -> PathBuf {
        let mut path = self.root.join(PROCESSED_DIR);
        if let Some(dir) = item.source_path.parent() {
            path.push(dir);
        }
        path.push(format!("{}.{}", item.item_id, self.format.extension()));
        path
    }
}

/// Turn a catalog `data_file` value into a root-relative path.
///
/// Leading separators and `.` components are dropped; `..` is rejected.
pub fn normalize_source_path(raw: &str) -> Result<PathBuf, NamingError> {
    let mut normalized = PathBuf::new();
    for component in Path::new(raw).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return Err(NamingError::EscapingSourcePath(raw.to_string())),
        }
    }
    if normalized.as_os_str().is_empty() {
        return Err(NamingError::EmptySourcePath);
    }
    Ok(normalized)
}

/// Item ids become file names, so they must be a single path component.
pub fn validate_item_id(raw: &str) -> Result<(), NamingError> {
    if raw.is_empty() {
        return Err(NamingError::EmptyItemId);
    }
    if raw.contains('/') || raw.contains('\\') || raw == "." || raw == ".." {
        return Err(NamingError::ItemIdWithSeparator(raw.to_string()));
    }
    Ok(())
}
