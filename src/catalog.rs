//! Source enumeration.
//!
//! The pipeline pulls [`WorkItem`]s from a [`WorkSource`] one at a time, so
//! conversion starts while rows are still being read. The production source
//! is [`SqliteCatalog`], which runs one fixed join over a catalog's
//! `index.db`:
//!
//! ```text
//! collections ──< collection_items >── items
//!   name                                 original_id, data_file
//! ```
//!
//! ## Error classes
//!
//! - [`CatalogError`] is fatal: the store cannot be opened, the query cannot
//!   run, or the cursor breaks mid-stream.
//! - [`ScanError`] is per row: the row is logged and skipped, and the batch
//!   carries on.

use crate::naming::{NamingError, normalize_source_path, validate_item_id};
use crate::types::WorkItem;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default catalog database file name, relative to the root.
pub const DEFAULT_DATABASE: &str = "index.db";

/// One row per (collection, item) membership.
pub const CATALOG_QUERY: &str = "\
select c.name, i.original_id, i.data_file from items i
    inner join collection_items ci on ci.item_id = i.id
    inner join collections c on ci.collection_id = c.id";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("open catalog '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },
    #[error("query catalog: {0}")]
    Query(#[source] rusqlite::Error),
    #[error("loop over catalog rows: {0}")]
    Iterate(#[source] rusqlite::Error),
}

/// A malformed catalog row. Never fatal.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("column {column}: {reason}")]
    Column { column: &'static str, reason: String },
    #[error(transparent)]
    Naming(#[from] NamingError),
}

/// What an enumeration pass saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationSummary {
    /// Rows read, including skipped ones.
    pub rows: usize,
    /// Rows rejected with a [`ScanError`].
    pub skipped_rows: usize,
    /// The sink asked to stop before the source was exhausted.
    pub stopped_early: bool,
}

/// A stream of work items.
///
/// `sink` is called once per valid item, on the caller's thread. Returning
/// [`ControlFlow::Break`] stops enumeration; the summary then reports
/// `stopped_early`.
pub trait WorkSource {
    fn for_each_item(
        &mut self,
        sink: &mut dyn FnMut(WorkItem) -> ControlFlow<()>,
    ) -> Result<EnumerationSummary, CatalogError>;
}

impl WorkSource for Vec<WorkItem> {
    fn for_each_item(
        &mut self,
        sink: &mut dyn FnMut(WorkItem) -> ControlFlow<()>,
    ) -> Result<EnumerationSummary, CatalogError> {
        let mut summary = EnumerationSummary::default();
        for item in self.drain(..) {
            summary.rows += 1;
            if sink(item).is_break() {
                summary.stopped_early = true;
                break;
            }
        }
        Ok(summary)
    }
}

/// Read-only handle on a catalog database.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open an existing catalog. A missing file is an error, never an
    /// empty new database.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        info!(path = %path.display(), "opening catalog");
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| CatalogError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self { conn })
    }
}

impl WorkSource for SqliteCatalog {
    fn for_each_item(
        &mut self,
        sink: &mut dyn FnMut(WorkItem) -> ControlFlow<()>,
    ) -> Result<EnumerationSummary, CatalogError> {
        info!("querying catalog");
        let mut stmt = self.conn.prepare(CATALOG_QUERY).map_err(CatalogError::Query)?;
        let mut rows = stmt.query([]).map_err(CatalogError::Query)?;

        let mut summary = EnumerationSummary::default();
        while let Some(row) = rows.next().map_err(CatalogError::Iterate)? {
            summary.rows += 1;
            match scan_row(row) {
                Ok(item) => {
                    if sink(item).is_break() {
                        summary.stopped_early = true;
                        break;
                    }
                }
                Err(err) => {
                    warn!(row = summary.rows, error = %err, "scan row");
                    summary.skipped_rows += 1;
                }
            }
        }
        debug!(?summary, "catalog enumeration finished");
        Ok(summary)
    }
}

/// Turn one result row into a [`WorkItem`].
fn scan_row(row: &Row<'_>) -> Result<WorkItem, ScanError> {
    let collection = column_text(row, 0, "collection")?;
    let item_id = column_text(row, 1, "original_id")?;
    let data_file = column_text(row, 2, "data_file")?;

    validate_item_id(&item_id)?;
    let source_path = normalize_source_path(&data_file)?;

    Ok(WorkItem {
        collection,
        item_id,
        source_path,
    })
}

/// Read a column as text. Integers are accepted and rendered in decimal,
/// since ids are stored either way in the wild.
fn column_text(row: &Row<'_>, index: usize, column: &'static str) -> Result<String, ScanError> {
    let value = row.get_ref(index).map_err(|e| ScanError::Column {
        column,
        reason: e.to_string(),
    })?;
    match value {
        ValueRef::Text(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| ScanError::Column {
            column,
            reason: "not valid UTF-8".to_string(),
        }),
        ValueRef::Integer(n) => Ok(n.to_string()),
        ValueRef::Null => Err(ScanError::Column {
            column,
            reason: "is NULL".to_string(),
        }),
        ValueRef::Real(_) | ValueRef::Blob(_) => Err(ScanError::Column {
            column,
            reason: format!("unexpected {} value", value.data_type()),
        }),
    }
}
