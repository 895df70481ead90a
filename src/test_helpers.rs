//! Shared test utilities for the photo-press test suite.
//!
//! Builders for the two inputs a batch reads: source images under a root
//! and the catalog database enumerating them.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! create_test_jpeg(&tmp.path().join("a/x.jpg"), 400, 300);
//! create_catalog(&tmp.path().join("index.db"), &[("Vacation", "p1", "a/x.jpg")]);
//! ```

use image::{ExtendedColorType, ImageEncoder, RgbImage};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;

// =========================================================================
// Source images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a small valid PNG file with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    gradient(width, height).save(path).unwrap();
}

/// Create a file that carries a JPEG extension but cannot be decoded.
pub fn create_corrupt_image(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"\xFF\xD8\xFF\xE0 definitely not a photo").unwrap();
}

// =========================================================================
// Catalog
// =========================================================================

/// Create a catalog database with one membership per `(collection, item_id,
/// data_file)` row. Collections and items are deduplicated the way a real
/// catalog stores them, so the same item may belong to several collections.
pub fn create_catalog(path: &Path, rows: &[(&str, &str, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "create table collections (id integer primary key, name text not null);
         create table items (id integer primary key, original_id, data_file text);
         create table collection_items (item_id integer not null, collection_id integer not null);",
    )
    .unwrap();

    let mut collections: HashMap<&str, i64> = HashMap::new();
    let mut items: HashMap<(&str, &str), i64> = HashMap::new();

    for &(collection, item_id, data_file) in rows {
        let next_collection = collections.len() as i64 + 1;
        let collection_key = *collections.entry(collection).or_insert_with(|| {
            conn.execute(
                "insert into collections (id, name) values (?1, ?2)",
                params![next_collection, collection],
            )
            .unwrap();
            next_collection
        });

        let next_item = items.len() as i64 + 1;
        let item_key = *items.entry((item_id, data_file)).or_insert_with(|| {
            conn.execute(
                "insert into items (id, original_id, data_file) values (?1, ?2, ?3)",
                params![next_item, item_id, data_file],
            )
            .unwrap();
            next_item
        });

        conn.execute(
            "insert into collection_items (item_id, collection_id) values (?1, ?2)",
            params![item_key, collection_key],
        )
        .unwrap();
    }
}
