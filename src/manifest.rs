//! Manifest persistence and verification.
//!
//! The manifest is the batch's only durable summary: a JSON object mapping
//! each collection name to the derived image paths under it.
//!
//! ```json
//! {
//!   "Family": ["timeliner_repo/processed/a/p1.webp"],
//!   "Vacation": ["timeliner_repo/processed/a/p1.webp", "timeliner_repo/processed/a/p3.webp"]
//! }
//! ```
//!
//! [`write_manifest`] goes through [`write_atomic`], so a reader never sees a
//! half-written file. [`verify_manifest`] re-reads every listed image and
//! checks it against the expected frame.

use crate::aggregate::Manifest;
use crate::imaging::{Frame, ImageBackend};
use crate::write::{WriteError, write_atomic};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("read manifest '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse manifest '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Write `manifest` to `path` as pretty-printed JSON.
pub fn write_manifest(manifest: &Manifest, path: &Path) -> Result<(), ManifestError> {
    let mut json = serde_json::to_string_pretty(manifest).map_err(ManifestError::Serialize)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())?;
    Ok(())
}

pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A listed image that does not hold up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyProblem {
    Missing {
        collection: String,
        path: PathBuf,
    },
    Unreadable {
        collection: String,
        path: PathBuf,
        message: String,
    },
    WrongDimensions {
        collection: String,
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Paths checked, duplicates included.
    pub checked: usize,
    pub problems: Vec<VerifyProblem>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Check that every path in `manifest` exists and decodes to exactly `frame`.
pub fn verify_manifest(
    backend: &impl ImageBackend,
    manifest: &Manifest,
    frame: Frame,
) -> VerifyReport {
    let mut report = VerifyReport::default();
    for (collection, paths) in manifest.iter() {
        for path in paths {
            report.checked += 1;
            if !path.exists() {
                report.problems.push(VerifyProblem::Missing {
                    collection: collection.to_string(),
                    path: path.clone(),
                });
                continue;
            }
            match backend.identify(path) {
                Ok(dims) if dims.width == frame.width && dims.height == frame.height => {}
                Ok(dims) => report.problems.push(VerifyProblem::WrongDimensions {
                    collection: collection.to_string(),
                    path: path.clone(),
                    width: dims.width,
                    height: dims.height,
                }),
                Err(err) => report.problems.push(VerifyProblem::Unreadable {
                    collection: collection.to_string(),
                    path: path.clone(),
                    message: err.to_string(),
                }),
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::imaging::Dimensions;
    use crate::imaging::backend::tests::MockBackend;
    use crate::types::{ConversionOutcome, WorkItem};
    use tempfile::TempDir;

    fn manifest_of(entries: &[(&str, &Path)]) -> Manifest {
        let agg = Aggregator::new();
        for (i, (collection, path)) in entries.iter().enumerate() {
            agg.record(
                &WorkItem::new(*collection, format!("p{i}"), "a/x.jpg"),
                ConversionOutcome::Converted(path.to_path_buf()),
            );
        }
        agg.finish().manifest
    }

    #[test]
    fn write_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let manifest = manifest_of(&[
            ("Vacation", Path::new("repo/processed/a/p1.webp")),
            ("Family", Path::new("repo/processed/a/p1.webp")),
        ]);

        write_manifest(&manifest, &path).unwrap();

        assert_eq!(load_manifest(&path).unwrap(), manifest);
    }

    #[test]
    fn written_file_is_pretty_sorted_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        let manifest = manifest_of(&[
            ("Vacation", Path::new("r/v.webp")),
            ("Family", Path::new("r/f.webp")),
        ]);

        write_manifest(&manifest, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \"Family\""));
        assert!(content.find("Family").unwrap() < content.find("Vacation").unwrap());
        assert!(content.ends_with("}\n"));
    }

    #[test]
    fn empty_manifest_is_empty_object() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");

        write_manifest(&Manifest::default(), &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}\n");
    }

    #[test]
    fn write_into_missing_directory_creates_it() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/index.json");

        write_manifest(&Manifest::default(), &path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn write_under_a_file_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blocker"), b"x").unwrap();

        let result = write_manifest(&Manifest::default(), &tmp.path().join("blocker/index.json"));

        assert!(matches!(
            result,
            Err(ManifestError::Write(WriteError::DirectoryCreate { .. }))
        ));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_manifest(&tmp.path().join("nope.json"));
        assert!(matches!(result, Err(ManifestError::Read { .. })));
    }

    #[test]
    fn load_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");
        fs::write(&path, r#"{"Vacation": "not a list"}"#).unwrap();

        assert!(matches!(
            load_manifest(&path),
            Err(ManifestError::Parse { .. })
        ));
    }

    #[test]
    fn verify_reports_missing_and_wrong_dimensions() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.webp");
        let small = tmp.path().join("small.webp");
        let gone = tmp.path().join("gone.webp");
        fs::write(&good, b"x").unwrap();
        fs::write(&small, b"x").unwrap();
        let manifest = manifest_of(&[
            ("A", good.as_path()),
            ("A", small.as_path()),
            ("B", gone.as_path()),
        ]);

        // identify pops from the back: `good` is checked first.
        let backend = MockBackend::with_dimensions(vec![
            Dimensions {
                width: 640,
                height: 480,
            },
            Dimensions {
                width: 1920,
                height: 1080,
            },
        ]);
        let report = verify_manifest(&backend, &manifest, Frame::new(1920, 1080));

        assert_eq!(report.checked, 3);
        assert!(!report.is_ok());
        assert_eq!(
            report.problems,
            vec![
                VerifyProblem::WrongDimensions {
                    collection: "A".to_string(),
                    path: small,
                    width: 640,
                    height: 480,
                },
                VerifyProblem::Missing {
                    collection: "B".to_string(),
                    path: gone,
                },
            ]
        );
    }
}
