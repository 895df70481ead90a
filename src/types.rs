//! Shared types flowing through the conversion pipeline.
//!
//! A [`WorkItem`] is produced by the catalog, owned by the worker that
//! processes it, and turned into exactly one [`ConversionOutcome`], which the
//! aggregator consumes.

use crate::imaging::ConvertError;
use std::path::{Path, PathBuf};

/// One source image to convert, as enumerated from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Collection (album) the image belongs to. The same image may appear
    /// under several collections.
    pub collection: String,
    /// Stable identifier; names the derived file.
    pub item_id: String,
    /// Source path relative to the catalog root.
    pub source_path: PathBuf,
}

impl WorkItem {
    pub fn new(
        collection: impl Into<String>,
        item_id: impl Into<String>,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            collection: collection.into(),
            item_id: item_id.into(),
            source_path: source_path.into(),
        }
    }
}

/// Why an item was not converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source file is not on disk. Not an error.
    MissingSource(PathBuf),
    /// A derived file already exists at this path.
    AlreadyConverted(PathBuf),
}

/// Terminal result of processing one [`WorkItem`].
#[derive(Debug)]
pub enum ConversionOutcome {
    Skipped(SkipReason),
    Converted(PathBuf),
    Failed(ConvertError),
}

impl ConversionOutcome {
    /// The derived image path this outcome contributes to the manifest, if any.
    pub fn output_path(&self) -> Option<&Path> {
        match self {
            ConversionOutcome::Converted(path)
            | ConversionOutcome::Skipped(SkipReason::AlreadyConverted(path)) => Some(path),
            ConversionOutcome::Skipped(SkipReason::MissingSource(_))
            | ConversionOutcome::Failed(_) => None,
        }
    }
}
