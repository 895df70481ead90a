//! Press configuration module.
//!
//! Handles loading and validating `config.toml`. Stock defaults
//! are overridden by an optional `config.toml` in the catalog root, and
//! command-line flags override both.
//!
//! ## Config File Location
//!
//! ```text
//! timeliner_repo/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── index.db                 # Catalog database
//! ├── a/
//! │   └── x.jpg                # Source images
//! └── processed/               # Derived images (written by `convert`)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [catalog]
//! database = "index.db"     # Relative to the root
//!
//! [frame]
//! width = 1920
//! height = 1080
//! blur_sigma = 5.0          # Background blur; 0 disables
//!
//! [output]
//! format = "webp"           # "webp" or "avif"
//! quality = 75              # 1-100
//! manifest = "index.json"   # Relative to the working directory
//!
//! [processing]
//! workers = 25              # Concurrent conversions
//! # deadline_secs = 600     # Stop submitting new items after this long
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::catalog::DEFAULT_DATABASE;
use crate::imaging::OutputFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the catalog root.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Press configuration loaded from `config.toml`.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PressConfig {
    /// Where the catalog database lives.
    pub catalog: CatalogConfig,
    /// Output frame and letterbox background.
    pub frame: FrameConfig,
    /// Codec, quality and manifest location.
    pub output: OutputConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PressConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.database.is_empty() {
            return Err(ConfigError::Validation(
                "catalog.database must not be empty".into(),
            ));
        }
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(ConfigError::Validation(
                "frame.width and frame.height must be non-zero".into(),
            ));
        }
        if !self.frame.blur_sigma.is_finite() || self.frame.blur_sigma < 0.0 {
            return Err(ConfigError::Validation(
                "frame.blur_sigma must be a finite value >= 0".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.output.manifest.is_empty() {
            return Err(ConfigError::Validation(
                "output.manifest must not be empty".into(),
            ));
        }
        if self.processing.workers == 0 {
            return Err(ConfigError::Validation(
                "processing.workers must be at least 1".into(),
            ));
        }
        if self.processing.deadline_secs == Some(0) {
            return Err(ConfigError::Validation(
                "processing.deadline_secs must be positive when set".into(),
            ));
        }
        Ok(())
    }

    /// Catalog database path for a given root.
    pub fn database_path(&self, root: &Path) -> PathBuf {
        root.join(&self.catalog.database)
    }

    /// Apply command-line overrides, then re-validate.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(workers) = overrides.workers {
            self.processing.workers = workers;
        }
        if let Some(width) = overrides.width {
            self.frame.width = width;
        }
        if let Some(height) = overrides.height {
            self.frame.height = height;
        }
        if let Some(manifest) = &overrides.manifest {
            self.output.manifest = manifest.to_string_lossy().into_owned();
        }
        self.validate()
    }
}

/// Values supplied on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workers: Option<usize>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// Database file, relative to the root.
    pub database: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

/// Output frame settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
    /// Gaussian sigma for the letterbox background. `0.0` leaves it sharp.
    pub blur_sigma: f32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            blur_sigma: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Codec of every derived image. Also picks the file extension, so
    /// switching it makes earlier outputs invisible to the existence check.
    pub format: OutputFormat,
    /// Lossy encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Manifest path, relative to the working directory.
    pub manifest: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            quality: 75,
            manifest: "index.json".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Number of concurrent conversions. Not clamped to the core count:
    /// workers also wait on the filesystem.
    pub workers: usize,
    /// Stop submitting new items after this many seconds. In-flight items
    /// still finish.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_secs: Option<u64>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            workers: 25,
            deadline_secs: None,
        }
    }
}

// =============================================================================
// Config loading
// =============================================================================

/// Load config from `config.toml` in the catalog root.
///
/// A missing file yields the stock defaults. Keys the file leaves out keep
/// their defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(root: &Path) -> Result<PressConfig, ConfigError> {
    let config = match fs::read_to_string(root.join(CONFIG_FILE)) {
        Ok(content) => toml::from_str::<PressConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PressConfig::default(),
        Err(e) => return Err(e.into()),
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Press Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the catalog root (next to index.db).
# Command-line flags override values set here.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Catalog
# ---------------------------------------------------------------------------
[catalog]
# Catalog database file, relative to the root.
database = "index.db"

# ---------------------------------------------------------------------------
# Output frame
# ---------------------------------------------------------------------------
[frame]
# Every derived image is exactly width x height pixels. The whole source
# image is kept, centered, over a blurred copy of itself.
width = 1920
height = 1080

# Gaussian blur sigma for the background fill. 0 disables the blur.
blur_sigma = 5.0

# ---------------------------------------------------------------------------
# Output encoding
# ---------------------------------------------------------------------------
[output]
# Codec for derived images: "webp" or "avif". Also the file extension;
# changing it means earlier outputs are no longer found and get redone.
format = "webp"

# Lossy encoding quality (1 = worst, 100 = best).
quality = 75

# Manifest file, relative to the working directory.
manifest = "index.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Number of concurrent conversions.
workers = 25

# Stop submitting new items after this many seconds. Items already being
# converted still finish and are listed in the manifest.
# deadline_secs = 600
"##
}
