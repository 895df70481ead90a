//! Concurrent conversion of a catalog into derived images.
//!
//! The stage that turns a [`WorkSource`] into a [`BatchReport`]. Items are
//! pulled from the source on the calling thread and handed one at a time to a
//! dedicated worker pool, so conversion overlaps enumeration. Submission is
//! paced by `workers` slots: the producer waits for a free slot before
//! handing over the next item, so a submitted item is always in flight.
//!
//! ## Per-item decision
//!
//! ```text
//! source missing           → skipped, not in manifest
//! derived file exists      → already converted, in manifest
//! otherwise                → convert → converted (in manifest) | failed
//! ```
//!
//! The existence check is the whole idempotency story: a second run over the
//! same catalog converts nothing. A derived file from an older frame size or
//! format setting is reused as-is.
//!
//! ## Barrier
//!
//! Submission happens inside a rayon scope; the scope does not return until
//! every spawned item has recorded its outcome. Only then is the aggregator
//! consumed, so the report is always complete for the items submitted.
//!
//! ## Deadline
//!
//! With [`ProcessConfig::deadline`] set, no new items are submitted once it
//! has passed, including while the producer is waiting for a free slot.
//! Items already in flight still finish and are reported; rows not yet read
//! are never looked at.

use crate::aggregate::{Aggregator, BatchReport};
use crate::catalog::{CatalogError, EnumerationSummary, WorkSource};
use crate::config::PressConfig;
use crate::imaging::{
    ConvertError, ConvertParams, Frame, ImageBackend, OutputFormat, Quality, RustBackend,
};
use crate::naming::OutputLayout;
use crate::types::{ConversionOutcome, SkipReason, WorkItem};
use std::ops::ControlFlow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, SyncSender, sync_channel};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal pipeline errors. Per-item failures never surface here; they are in
/// the [`BatchReport`].
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Settings for one conversion batch.
#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Catalog root. Sources and derived images resolve under it.
    pub root: PathBuf,
    /// Upper bound on concurrent conversions.
    pub workers: usize,
    pub frame: Frame,
    pub format: OutputFormat,
    pub quality: Quality,
    pub blur_sigma: f32,
    /// Stop submitting new items once this much time has passed.
    pub deadline: Option<Duration>,
}

impl ProcessConfig {
    /// Build a ProcessConfig from resolved config values.
    pub fn from_press_config(root: &Path, config: &PressConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            workers: config.processing.workers,
            frame: Frame::new(config.frame.width, config.frame.height),
            format: config.output.format,
            quality: Quality::new(config.output.quality),
            blur_sigma: config.frame.blur_sigma,
            deadline: config.processing.deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.root, self.format)
    }
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self::from_press_config(Path::new("."), &PressConfig::default())
    }
}

/// Progress events emitted while a batch runs, one per finished item.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    ItemProcessed {
        collection: String,
        item_id: String,
        source_path: PathBuf,
        status: ItemStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Converted(PathBuf),
    AlreadyConverted(PathBuf),
    MissingSource(PathBuf),
    Failed(String),
}

impl ProcessEvent {
    fn item(item: &WorkItem, outcome: &ConversionOutcome) -> Self {
        let status = match outcome {
            ConversionOutcome::Converted(path) => ItemStatus::Converted(path.clone()),
            ConversionOutcome::Skipped(SkipReason::AlreadyConverted(path)) => {
                ItemStatus::AlreadyConverted(path.clone())
            }
            ConversionOutcome::Skipped(SkipReason::MissingSource(path)) => {
                ItemStatus::MissingSource(path.clone())
            }
            ConversionOutcome::Failed(err) => ItemStatus::Failed(err.to_string()),
        };
        ProcessEvent::ItemProcessed {
            collection: item.collection.clone(),
            item_id: item.item_id.clone(),
            source_path: item.source_path.clone(),
            status,
        }
    }
}

/// Result of a finished batch.
#[derive(Debug)]
pub struct ProcessResult {
    pub report: BatchReport,
    pub enumeration: EnumerationSummary,
    /// Items handed to the pool. Equals `report.stats.total()`.
    pub submitted: usize,
}

impl ProcessResult {
    /// Whether the deadline cut enumeration short.
    pub fn stopped_early(&self) -> bool {
        self.enumeration.stopped_early
    }
}

/// What the existence filter decided for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    MissingSource(PathBuf),
    AlreadyConverted(PathBuf),
    NeedsConversion { source: PathBuf, output: PathBuf },
}

/// Decide what to do with an item by looking at the filesystem.
///
/// The source check comes first: a derived file whose source has since
/// disappeared is not listed.
pub fn classify(layout: &OutputLayout, item: &WorkItem) -> Classification {
    let source = layout.source_path(item);
    if !source.exists() {
        return Classification::MissingSource(source);
    }
    let output = layout.derived_path(item);
    if output.exists() {
        return Classification::AlreadyConverted(output);
    }
    Classification::NeedsConversion { source, output }
}

/// Run one item to its terminal outcome. Never panics outward: a panic in
/// the backend becomes a failed outcome for this item only.
pub fn process_item(
    backend: &impl ImageBackend,
    layout: &OutputLayout,
    config: &ProcessConfig,
    item: &WorkItem,
) -> ConversionOutcome {
    let (source, output) = match classify(layout, item) {
        Classification::MissingSource(path) => {
            debug!(item = %item.item_id, path = %path.display(), "source missing");
            return ConversionOutcome::Skipped(SkipReason::MissingSource(path));
        }
        Classification::AlreadyConverted(path) => {
            debug!(item = %item.item_id, path = %path.display(), "already converted");
            return ConversionOutcome::Skipped(SkipReason::AlreadyConverted(path));
        }
        Classification::NeedsConversion { source, output } => (source, output),
    };

    let params = ConvertParams {
        source,
        output,
        frame: config.frame,
        format: config.format,
        quality: config.quality,
        blur_sigma: config.blur_sigma,
    };

    let result = catch_unwind(AssertUnwindSafe(|| backend.convert(&params))).unwrap_or_else(
        |payload| {
            Err(ConvertError::Panic {
                path: params.source.clone(),
                message: panic_message(payload.as_ref()),
            })
        },
    );

    match result {
        Ok(()) => {
            debug!(item = %item.item_id, path = %params.output.display(), "converted");
            ConversionOutcome::Converted(params.output)
        }
        Err(err) => {
            warn!(
                item = %item.item_id,
                collection = %item.collection,
                kind = err.kind(),
                error = %err,
                "conversion failed"
            );
            ConversionOutcome::Failed(err)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Convert every item from `source` with the production backend.
pub fn process(
    source: &mut impl WorkSource,
    config: &ProcessConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(&backend, source, config, events)
}

/// Convert every item from `source` using a specific backend (allows testing
/// with mock).
///
/// Returns once every submitted item has a recorded outcome. A
/// [`CatalogError`] is returned only after in-flight items have drained.
pub fn process_with_backend(
    backend: &impl ImageBackend,
    source: &mut impl WorkSource,
    config: &ProcessConfig,
    events: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .thread_name(|i| format!("convert-{i}"))
        .build()?;

    let layout = config.layout();
    let aggregator = Aggregator::new();
    let started = Instant::now();
    let mut submitted = 0usize;

    info!(
        root = %config.root.display(),
        workers = config.workers,
        frame = %config.frame,
        format = %config.format,
        "starting conversion"
    );

    let slots = Slots::new(config.workers.max(1));
    let layout_ref = &layout;
    let aggregator_ref = &aggregator;
    let enumeration = pool.in_place_scope(|scope| {
        source.for_each_item(&mut |item| {
            if !slots.acquire(started, config.deadline) {
                info!(submitted, "deadline reached, no further items submitted");
                return ControlFlow::Break(());
            }
            submitted += 1;
            let events = events.clone();
            let release = slots.releaser();
            scope.spawn(move |_| {
                let outcome = process_item(backend, layout_ref, config, &item);
                if let Some(tx) = &events {
                    tx.send(ProcessEvent::item(&item, &outcome)).ok();
                }
                aggregator_ref.record(&item, outcome);
                release.send(()).ok();
            });
            ControlFlow::Continue(())
        })
    });
    // Every spawned item has recorded by now.
    drop(events);

    let enumeration = enumeration?;
    let report = aggregator.finish();
    info!(
        stats = %report.stats,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "conversion finished"
    );

    Ok(ProcessResult {
        report,
        enumeration,
        submitted,
    })
}

/// Fixed set of submission slots, one per worker.
///
/// A slot is taken before an item is spawned and handed back when the item
/// has recorded its outcome. The channel holds exactly `count` tokens, so
/// handing one back never blocks.
struct Slots {
    release: SyncSender<()>,
    acquire: Receiver<()>,
}

impl Slots {
    fn new(count: usize) -> Self {
        let (release, acquire) = sync_channel(count);
        for _ in 0..count {
            release.send(()).ok();
        }
        Self { release, acquire }
    }

    fn releaser(&self) -> SyncSender<()> {
        self.release.clone()
    }

    /// Wait for a free slot. Returns false once `deadline` (measured from
    /// `started`) has passed, whether or not a slot is free.
    fn acquire(&self, started: Instant, deadline: Option<Duration>) -> bool {
        match deadline {
            None => self.acquire.recv().is_ok(),
            Some(deadline) => {
                let elapsed = started.elapsed();
                if elapsed >= deadline {
                    return false;
                }
                self.acquire.recv_timeout(deadline - elapsed).is_ok()
            }
        }
    }
}
