use clap::{Parser, Subcommand};
use photo_press::catalog::{CatalogError, SqliteCatalog};
use photo_press::config::{self, ConfigError, ConfigOverrides};
use photo_press::imaging::{Frame, RustBackend};
use photo_press::logging::{self, LogLevel, LoggingError};
use photo_press::manifest::{self, ManifestError};
use photo_press::output;
use photo_press::process::{self, ProcessConfig, ProcessError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "photo-press")]
#[command(about = "Convert a photo catalog into fixed-size letterboxed images")]
#[command(long_about = "\
Convert a photo catalog into fixed-size letterboxed images

Every image the catalog lists is decoded, fitted whole inside a fixed frame
over a blurred copy of itself, and encoded in a single codec. A JSON
manifest maps each collection to its derived images.

Catalog layout:

  timeliner_repo/
  ├── config.toml              # Optional settings (see gen-config)
  ├── index.db                 # Catalog: collections, items, memberships
  ├── a/
  │   └── x.jpg                # Source image (items.data_file = \"a/x.jpg\")
  └── processed/
      └── a/
          └── p1.webp          # Derived image (named after items.original_id)

Items whose derived image already exists are not converted again.

Run 'photo-press gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Catalog root directory
    #[arg(long, default_value = "./timeliner_repo", global = true)]
    root: PathBuf,

    /// Log verbosity on stderr (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Number of concurrent conversions
    #[arg(long)]
    workers: Option<usize>,

    /// Output frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Output frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Manifest path, relative to the working directory
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Do not print a line per item
    #[arg(long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct VerifyArgs {
    /// Manifest path, relative to the working directory
    #[arg(long)]
    manifest: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert every cataloged image and write the manifest
    Convert(ConvertArgs),
    /// Check that every image in the manifest exists with the frame size
    Verify(VerifyArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

/// Errors that end the run, named after the phase that failed.
#[derive(Error, Debug)]
enum Fatal {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("setup: {0}")]
    Logging(#[from] LoggingError),
    #[error("setup: {0}")]
    Catalog(CatalogError),
    #[error("setup: {0}")]
    Pool(rayon::ThreadPoolBuildError),
    #[error("enumeration: {0}")]
    Enumeration(CatalogError),
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
}

impl From<ProcessError> for Fatal {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Pool(e) => Fatal::Pool(e),
            // The query never ran: nothing was enumerated yet
            ProcessError::Catalog(e @ CatalogError::Query(_)) => Fatal::Catalog(e),
            ProcessError::Catalog(e) => Fatal::Enumeration(e),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        // Without a subscriber the message would be lost
        Err(err @ Fatal::Logging(_)) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Fatal> {
    match &cli.command {
        Command::Convert(args) => {
            logging::init_logging(cli.log_level)?;
            convert(&cli.root, args)
        }
        Command::Verify(args) => {
            logging::init_logging(cli.log_level)?;
            verify(&cli.root, args)
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn convert(root: &Path, args: &ConvertArgs) -> Result<ExitCode, Fatal> {
    let mut press_config = config::load_config(root)?;
    press_config.apply_overrides(&ConfigOverrides {
        workers: args.workers,
        width: args.width,
        height: args.height,
        manifest: args.manifest.clone(),
    })?;

    let mut catalog =
        SqliteCatalog::open(&press_config.database_path(root)).map_err(Fatal::Catalog)?;
    let process_config = ProcessConfig::from_press_config(root, &press_config);

    let (events, printer) = if args.quiet {
        (None, None)
    } else {
        let (tx, rx) = std::sync::mpsc::channel();
        let printer = std::thread::spawn(move || {
            for event in rx {
                for line in output::format_process_event(&event) {
                    println!("{}", line);
                }
            }
        });
        (Some(tx), Some(printer))
    };

    let result = process::process(&mut catalog, &process_config, events);
    if let Some(printer) = printer {
        printer.join().ok();
    }
    let result = result?;

    if !result.report.errors.is_empty() {
        warn!(failed = result.report.errors.len(), "{}", result.report.errors);
    }

    let manifest_path = PathBuf::from(&press_config.output.manifest);
    manifest::write_manifest(&result.report.manifest, &manifest_path)?;
    info!(path = %manifest_path.display(), "manifest written");

    output::print_convert_summary(&result, &manifest_path);
    Ok(ExitCode::SUCCESS)
}

fn verify(root: &Path, args: &VerifyArgs) -> Result<ExitCode, Fatal> {
    let mut press_config = config::load_config(root)?;
    press_config.apply_overrides(&ConfigOverrides {
        manifest: args.manifest.clone(),
        ..ConfigOverrides::default()
    })?;

    let manifest_path = PathBuf::from(&press_config.output.manifest);
    let loaded = manifest::load_manifest(&manifest_path)?;
    let frame = Frame::new(press_config.frame.width, press_config.frame.height);

    let report = manifest::verify_manifest(&RustBackend::new(), &loaded, frame);
    output::print_verify_report(&report, frame);

    if report.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
