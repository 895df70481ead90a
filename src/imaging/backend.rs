//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs:
//! `identify` (read dimensions, used by `verify`) and `convert` (decode,
//! letterbox, encode, persist, one whole item).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests drive the
//! pipeline through the [`tests::MockBackend`] so concurrency and failure
//! isolation can be exercised without encoding real images.

use super::params::{ConvertParams, OutputFormat};
use crate::write::WriteError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-item conversion failure.
///
/// None of these abort a batch: the pipeline records them against the item
/// and moves on.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("open image '{}': {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("create directory structure '{}': {source}", path.display())]
    DirectoryCreate { path: PathBuf, source: io::Error },
    #[error("encode {format} image: {message}")]
    Encode {
        format: OutputFormat,
        message: String,
    },
    #[error("create {} image: {source}", path.display())]
    FileCreate { path: PathBuf, source: io::Error },
    #[error("save {} image: {source}", path.display())]
    FileWrite { path: PathBuf, source: io::Error },
    #[error("close {} image: {source}", path.display())]
    FileClose { path: PathBuf, source: io::Error },
    #[error("convert '{}' panicked: {message}", path.display())]
    Panic { path: PathBuf, message: String },
}

impl ConvertError {
    /// Short stable name of the failure kind, for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::Decode { .. } => "decode",
            ConvertError::DirectoryCreate { .. } => "directory-create",
            ConvertError::Encode { .. } => "encode",
            ConvertError::FileCreate { .. } => "file-create",
            ConvertError::FileWrite { .. } => "file-write",
            ConvertError::FileClose { .. } => "file-close",
            ConvertError::Panic { .. } => "panic",
        }
    }
}

impl From<WriteError> for ConvertError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::DirectoryCreate { path, source } => {
                ConvertError::DirectoryCreate { path, source }
            }
            WriteError::FileCreate { path, source } => ConvertError::FileCreate { path, source },
            WriteError::FileWrite { path, source } => ConvertError::FileWrite { path, source },
            WriteError::FileClose { path, source } => ConvertError::FileClose { path, source },
        }
    }
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because one backend instance is shared by every worker thread.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, ConvertError>;

    /// Convert one source image into its derived image at `params.output`.
    ///
    /// On success the output file is complete; on failure nothing exists
    /// at `params.output` that was not there before.
    fn convert(&self, params: &ConvertParams) -> Result<(), ConvertError>;
}
