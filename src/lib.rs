//! # Photo Press
//!
//! Normalizes a photo catalog into a derived image set: every cataloged
//! source image becomes one fixed-size, letterboxed image in a single codec,
//! and a JSON manifest maps each collection to its derived images.
//!
//! # Architecture: One Concurrent Batch
//!
//! ```text
//! index.db ─► catalog ─► process (worker pool) ─► aggregate ─► manifest ─► index.json
//!                           │
//!                           ├─ source missing?       → skip
//!                           ├─ derived file exists?  → reuse
//!                           └─ imaging: decode → letterbox → encode → write
//! ```
//!
//! Enumeration runs on the calling thread while a fixed pool of workers
//! converts items. Each item ends in exactly one outcome; the aggregator is
//! the only shared mutable state. The manifest is written once, after every
//! worker has finished.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Streams work items out of the SQLite catalog |
//! | [`process`] | Worker pool, existence filter, per-item failure isolation |
//! | [`imaging`] | Pure-Rust decode, letterbox transform, WebP/AVIF encoding |
//! | [`write`] | Write-then-rename persistence shared by images and the manifest |
//! | [`aggregate`] | Thread-safe outcome accumulation into manifest, failures and counts |
//! | [`manifest`] | Manifest JSON emit, load and verification |
//! | [`naming`] | Source and derived path scheme, catalog value validation |
//! | [`types`] | Work items and per-item outcomes |
//! | [`config`] | `config.toml` loading and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Existence Is Completion
//!
//! A derived file on disk means the item is done. There is no cache database
//! and no content hashing, so reruns are cheap and a partially finished batch
//! resumes where it stopped. The price is that changing the frame size leaves
//! old outputs in place; delete `processed/` to force a full rebuild. Because
//! of this rule, every write goes through [`write::write_atomic`] so a crash
//! cannot leave a truncated file under a final name.
//!
//! ## Whole Image, Never Cropped
//!
//! The foreground is scaled to fit inside the frame and centered. The space
//! around it is filled with a blurred, cover-cropped copy of the same image
//! rather than flat bars, so portrait shots on a landscape frame still fill
//! the screen.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding and resampling use the `image` crate; AVIF goes through `image`'s
//! rav1e encoder. WebP uses `libwebp` through the `webp` crate, built from
//! source, so there is still no system package to install.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod imaging;
pub mod logging;
pub mod manifest;
pub mod naming;
pub mod output;
pub mod process;
pub mod types;
pub mod write;

#[cfg(test)]
pub(crate) mod test_helpers;
