//! Thread-safe accumulation of conversion outcomes.
//!
//! Workers share one [`Aggregator`] by reference. [`Aggregator::record`] is
//! the only mutating entry point and the only place a lock is taken; the
//! critical section is a map append or a vector push. After the worker
//! barrier, [`Aggregator::finish`] consumes the aggregator and hands back the
//! immutable [`BatchReport`].

use crate::imaging::ConvertError;
use crate::types::{ConversionOutcome, SkipReason, WorkItem};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Collection name → derived image paths.
///
/// Paths within a collection are in completion order, which is not stable
/// across runs; compare them as multisets. Duplicated catalog rows yield
/// duplicated paths. Collections serialize in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    collections: BTreeMap<String, Vec<PathBuf>>,
}

impl Manifest {
    pub fn get(&self, collection: &str) -> Option<&[PathBuf]> {
        self.collections.get(collection).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.collections
            .iter()
            .map(|(name, paths)| (name.as_str(), paths.as_slice()))
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    /// Total paths across all collections, duplicates included.
    pub fn path_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Same manifest with every path list sorted, for order-insensitive
    /// comparison.
    pub fn normalized(&self) -> Manifest {
        let mut collections = self.collections.clone();
        for paths in collections.values_mut() {
            paths.sort();
        }
        Manifest { collections }
    }

    fn push(&mut self, collection: &str, path: &Path) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(path.to_path_buf());
    }
}

/// One failed item and why.
#[derive(Debug)]
pub struct ItemFailure {
    pub collection: String,
    pub item_id: String,
    pub source_path: PathBuf,
    pub error: ConvertError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item '{}': {}", self.item_id, self.error)
    }
}

/// Every per-item failure of a batch, in the order they were recorded.
#[derive(Debug, Default)]
pub struct BatchError {
    failures: Vec<ItemFailure>,
}

impl BatchError {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.len() {
            0 => write!(f, "no failures"),
            1 => write!(f, "{}", self.failures[0]),
            n => {
                write!(f, "{n} items failed: ")?;
                for (i, failure) in self.failures.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for BatchError {}

/// Outcome counts for a batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub converted: usize,
    pub already_converted: usize,
    pub missing_source: usize,
    pub failed: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.converted + self.already_converted + self.missing_source + self.failed
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} converted, {} already converted, {} missing, {} failed ({} total)",
            self.converted,
            self.already_converted,
            self.missing_source,
            self.failed,
            self.total()
        )
    }
}

/// Everything a finished batch produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub manifest: Manifest,
    pub errors: BatchError,
    pub stats: BatchStats,
}

#[derive(Default)]
struct Tally {
    manifest: Manifest,
    failures: Vec<ItemFailure>,
    stats: BatchStats,
}

/// Shared outcome accumulator. See the [module docs](self).
#[derive(Default)]
pub struct Aggregator {
    tally: Mutex<Tally>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the terminal outcome of one item.
    pub fn record(&self, item: &WorkItem, outcome: ConversionOutcome) {
        // Every mutation below is a single append, so a poisoned lock still
        // holds consistent data.
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = outcome.output_path() {
            tally.manifest.push(&item.collection, path);
        }
        match outcome {
            ConversionOutcome::Converted(_) => {
                tally.stats.converted += 1;
            }
            ConversionOutcome::Skipped(SkipReason::AlreadyConverted(_)) => {
                tally.stats.already_converted += 1;
            }
            ConversionOutcome::Skipped(SkipReason::MissingSource(_)) => {
                tally.stats.missing_source += 1;
            }
            ConversionOutcome::Failed(error) => {
                tally.stats.failed += 1;
                tally.failures.push(ItemFailure {
                    collection: item.collection.clone(),
                    item_id: item.item_id.clone(),
                    source_path: item.source_path.clone(),
                    error,
                });
            }
        }
    }

    /// Consume the aggregator after every worker has finished.
    pub fn finish(self) -> BatchReport {
        let tally = self
            .tally
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        BatchReport {
            manifest: tally.manifest,
            errors: BatchError {
                failures: tally.failures,
            },
            stats: tally.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn item(collection: &str, id: &str) -> WorkItem {
        WorkItem::new(collection, id, format!("a/{id}.jpg"))
    }

    fn decode_error(id: &str) -> ConvertError {
        ConvertError::Decode {
            path: PathBuf::from(format!("/r/a/{id}.jpg")),
            message: "bad data".to_string(),
        }
    }

    #[test]
    fn converted_and_already_converted_land_in_manifest() {
        let agg = Aggregator::new();
        agg.record(
            &item("Vacation", "p1"),
            ConversionOutcome::Converted("/r/processed/a/p1.webp".into()),
        );
        agg.record(
            &item("Vacation", "p2"),
            ConversionOutcome::Skipped(SkipReason::AlreadyConverted(
                "/r/processed/a/p2.webp".into(),
            )),
        );

        let report = agg.finish();
        assert_eq!(
            report.manifest.get("Vacation").unwrap(),
            &[
                PathBuf::from("/r/processed/a/p1.webp"),
                PathBuf::from("/r/processed/a/p2.webp")
            ]
        );
        assert!(report.errors.is_empty());
        assert_eq!(report.stats.converted, 1);
        assert_eq!(report.stats.already_converted, 1);
    }

    #[test]
    fn missing_source_is_counted_but_not_listed() {
        let agg = Aggregator::new();
        agg.record(
            &item("Vacation", "p2"),
            ConversionOutcome::Skipped(SkipReason::MissingSource("/r/a/y.jpg".into())),
        );

        let report = agg.finish();
        assert!(report.manifest.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(report.stats.missing_source, 1);
    }

    #[test]
    fn failures_are_tagged_with_item() {
        let agg = Aggregator::new();
        agg.record(
            &item("Vacation", "p3"),
            ConversionOutcome::Failed(decode_error("p3")),
        );

        let report = agg.finish();
        assert!(report.manifest.get("Vacation").is_none());
        assert_eq!(report.errors.len(), 1);
        let failure = &report.errors.failures()[0];
        assert_eq!(failure.item_id, "p3");
        assert_eq!(failure.collection, "Vacation");
        assert_eq!(failure.error.kind(), "decode");
    }

    #[test]
    fn duplicates_are_kept() {
        let agg = Aggregator::new();
        for _ in 0..2 {
            agg.record(
                &item("Vacation", "p1"),
                ConversionOutcome::Converted("/r/processed/a/p1.webp".into()),
            );
        }
        assert_eq!(agg.finish().manifest.path_count(), 2);
    }

    #[test]
    fn batch_error_display_combines_failures() {
        let agg = Aggregator::new();
        agg.record(&item("A", "p1"), ConversionOutcome::Failed(decode_error("p1")));
        agg.record(&item("A", "p2"), ConversionOutcome::Failed(decode_error("p2")));

        let text = agg.finish().errors.to_string();
        assert!(text.starts_with("2 items failed: item 'p1': open image"));
        assert!(text.contains("; item 'p2': open image"));
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let agg = Arc::new(Aggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let it = item(&format!("c{}", t % 3), &format!("{t}-{i}"));
                        agg.record(
                            &it,
                            ConversionOutcome::Converted(format!("/r/{t}-{i}.webp").into()),
                        );
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let report = Arc::into_inner(agg).unwrap().finish();
        assert_eq!(report.stats.total(), 2000);
        assert_eq!(report.manifest.path_count(), 2000);
        assert_eq!(report.manifest.collection_count(), 3);
    }

    #[test]
    fn stats_display() {
        let stats = BatchStats {
            converted: 3,
            already_converted: 2,
            missing_source: 1,
            failed: 0,
        };
        assert_eq!(
            stats.to_string(),
            "3 converted, 2 already converted, 1 missing, 0 failed (6 total)"
        );
    }

    #[test]
    fn manifest_serializes_as_plain_map() {
        let agg = Aggregator::new();
        agg.record(
            &item("Vacation", "p1"),
            ConversionOutcome::Converted("r/processed/a/p1.webp".into()),
        );
        let json = serde_json::to_string(&agg.finish().manifest).unwrap();
        assert_eq!(json, r#"{"Vacation":["r/processed/a/p1.webp"]}"#);
    }
}
