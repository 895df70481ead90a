//! End-to-end tests: SQLite catalog → real decode/letterbox/encode → manifest.
//!
//! Frames are kept small so the suite stays fast; one test converts a
//! full-size source into the default 1920x1080 frame.

use image::{ExtendedColorType, ImageEncoder, RgbImage};
use photo_press::catalog::SqliteCatalog;
use photo_press::imaging::{Frame, ImageBackend, OutputFormat, Quality, RustBackend};
use photo_press::manifest::{load_manifest, verify_manifest, write_manifest};
use photo_press::process::{ProcessConfig, process};
use rusqlite::{Connection, params};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

fn create_jpeg(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 96])
    });
    let file = fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// One row per `(collection, original_id, data_file)` membership.
fn create_catalog(path: &Path, rows: &[(&str, &str, &str)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "create table collections (id integer primary key, name text not null);
         create table items (id integer primary key, original_id text, data_file text);
         create table collection_items (item_id integer not null, collection_id integer not null);",
    )
    .unwrap();
    for (i, (collection, item_id, data_file)) in rows.iter().enumerate() {
        let key = i as i64 + 1;
        conn.execute(
            "insert into collections (id, name) values (?1, ?2)",
            params![key, collection],
        )
        .unwrap();
        conn.execute(
            "insert into items (id, original_id, data_file) values (?1, ?2, ?3)",
            params![key, item_id, data_file],
        )
        .unwrap();
        conn.execute(
            "insert into collection_items (item_id, collection_id) values (?1, ?1)",
            params![key],
        )
        .unwrap();
    }
}

fn small_config(root: &Path) -> ProcessConfig {
    ProcessConfig {
        root: root.to_path_buf(),
        workers: 4,
        frame: Frame::new(160, 90),
        format: OutputFormat::Webp,
        quality: Quality::new(75),
        blur_sigma: 2.0,
        deadline: None,
    }
}

fn run(root: &Path, config: &ProcessConfig) -> photo_press::process::ProcessResult {
    let mut catalog = SqliteCatalog::open(&root.join("index.db")).unwrap();
    process(&mut catalog, config, None).unwrap()
}

fn paths_of(result: &photo_press::process::ProcessResult, collection: &str) -> HashSet<PathBuf> {
    result
        .report
        .manifest
        .get(collection)
        .unwrap_or_default()
        .iter()
        .cloned()
        .collect()
}

#[test]
fn vacation_catalog_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    create_jpeg(&root.join("a/x.jpg"), 300, 200);
    create_jpeg(&root.join("a/z.jpg"), 120, 240);
    create_catalog(
        &root.join("index.db"),
        &[
            ("Vacation", "p1", "a/x.jpg"),
            ("Vacation", "p2", "a/y.jpg"),
            ("Vacation", "p3", "a/z.jpg"),
        ],
    );

    let result = run(root, &small_config(root));

    assert_eq!(
        paths_of(&result, "Vacation"),
        HashSet::from([
            root.join("processed/a/p1.webp"),
            root.join("processed/a/p3.webp"),
        ])
    );
    assert!(result.report.errors.is_empty());
    assert_eq!(result.report.stats.converted, 2);
    assert_eq!(result.report.stats.missing_source, 1);
    assert!(!root.join("processed/a/p2.webp").exists());

    let backend = RustBackend::new();
    for path in paths_of(&result, "Vacation") {
        let dims = backend.identify(&path).unwrap();
        assert_eq!((dims.width, dims.height), (160, 90));
    }
}

#[test]
fn second_run_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    create_jpeg(&root.join("a/x.jpg"), 200, 200);
    create_jpeg(&root.join("b/y.jpg"), 90, 160);
    create_catalog(
        &root.join("index.db"),
        &[("Vacation", "p1", "a/x.jpg"), ("Family", "p2", "b/y.jpg")],
    );
    let config = small_config(root);

    let first = run(root, &config);
    let output = root.join("processed/a/p1.webp");
    let modified = fs::metadata(&output).unwrap().modified().unwrap();

    let second = run(root, &config);

    assert_eq!(first.report.stats.converted, 2);
    assert_eq!(second.report.stats.converted, 0);
    assert_eq!(second.report.stats.already_converted, 2);
    assert_eq!(
        first.report.manifest.normalized(),
        second.report.manifest.normalized()
    );
    assert_eq!(fs::metadata(&output).unwrap().modified().unwrap(), modified);
}

#[test]
fn corrupt_source_is_isolated() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    create_jpeg(&root.join("a/x.jpg"), 200, 100);
    create_jpeg(&root.join("a/w.jpg"), 100, 200);
    fs::write(root.join("a/z.jpg"), b"\xFF\xD8\xFF\xE0 not really a jpeg").unwrap();
    create_catalog(
        &root.join("index.db"),
        &[
            ("Vacation", "p1", "a/x.jpg"),
            ("Vacation", "p3", "a/z.jpg"),
            ("Vacation", "p4", "a/w.jpg"),
        ],
    );

    let result = run(root, &small_config(root));

    assert_eq!(result.report.stats.converted, 2);
    assert_eq!(result.report.errors.len(), 1);
    let failure = &result.report.errors.failures()[0];
    assert_eq!(failure.item_id, "p3");
    assert_eq!(failure.error.kind(), "decode");
    assert_eq!(paths_of(&result, "Vacation").len(), 2);
    assert!(!root.join("processed/a/p3.webp").exists());
}

#[test]
fn large_source_fills_default_frame() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    create_jpeg(&root.join("big/pano.jpg"), 4000, 2000);
    create_catalog(&root.join("index.db"), &[("Wide", "pano", "big/pano.jpg")]);
    let config = ProcessConfig {
        frame: Frame::new(1920, 1080),
        blur_sigma: 5.0,
        ..small_config(root)
    };

    let result = run(root, &config);

    let output = root.join("processed/big/pano.webp");
    assert_eq!(paths_of(&result, "Wide"), HashSet::from([output.clone()]));
    let dims = RustBackend::new().identify(&output).unwrap();
    assert_eq!((dims.width, dims.height), (1920, 1080));
}

#[test]
fn avif_output_uses_avif_extension() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    create_jpeg(&root.join("a/x.jpg"), 64, 48);
    create_catalog(&root.join("index.db"), &[("Vacation", "p1", "a/x.jpg")]);
    let config = ProcessConfig {
        format: OutputFormat::Avif,
        frame: Frame::new(64, 64),
        ..small_config(root)
    };

    let result = run(root, &config);

    assert!(result.report.errors.is_empty());
    let output = root.join("processed/a/p1.avif");
    assert!(output.exists());
    let dims = RustBackend::new().identify(&output).unwrap();
    assert_eq!((dims.width, dims.height), (64, 64));
}

#[test]
fn manifest_written_and_verified() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("repo");
    create_jpeg(&root.join("a/x.jpg"), 300, 200);
    create_catalog(
        &root.join("index.db"),
        &[("Vacation", "p1", "a/x.jpg"), ("Family", "p2", "a/x.jpg")],
    );
    let config = small_config(&root);

    let result = run(&root, &config);
    let manifest_path = tmp.path().join("index.json");
    write_manifest(&result.report.manifest, &manifest_path).unwrap();

    let loaded = load_manifest(&manifest_path).unwrap();
    assert_eq!(loaded, result.report.manifest);
    assert_eq!(loaded.collection_count(), 2);

    let report = verify_manifest(&RustBackend::new(), &loaded, config.frame);
    assert!(report.is_ok(), "{:?}", report.problems);
    assert_eq!(report.checked, 2);

    let wrong_frame = verify_manifest(&RustBackend::new(), &loaded, Frame::new(1920, 1080));
    assert_eq!(wrong_frame.problems.len(), 2);
}

#[test]
fn deadline_in_the_past_converts_nothing() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    create_jpeg(&root.join("a/x.jpg"), 64, 48);
    create_catalog(&root.join("index.db"), &[("Vacation", "p1", "a/x.jpg")]);
    let config = ProcessConfig {
        deadline: Some(Duration::ZERO),
        ..small_config(root)
    };

    let result = run(root, &config);

    assert!(result.stopped_early());
    assert!(result.report.manifest.is_empty());
    assert!(!root.join("processed").exists());
}
