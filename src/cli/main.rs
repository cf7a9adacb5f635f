use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use upright::orientation::GeometricTransform;
use upright::pipeline::{self, FileReport};
use upright::{config, validator::UploadValidator};

#[derive(Parser, Debug)]
#[command(
    name = "upright",
    version,
    about = "Validate image files as untrusted uploads and normalize their EXIF orientation"
)]
struct Cli {
    /// Files or directories to validate
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Declared content type for every file (default: guessed from the extension)
    #[arg(long, value_name = "MIME")]
    content_type: Option<String>,

    /// Write accepted (and normalized) payloads into this directory
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Skip upload checks; only write rotated copies of sideways images into --out-dir
    #[arg(long, requires = "out_dir")]
    rotate_only: bool,

    /// With --rotate-only, keep the orientation tag in the rotated copies
    #[arg(long, requires = "rotate_only")]
    keep_tag: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(ExitCode::SUCCESS);
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let config = config::Config::load(cli.config.as_deref())?;
    let validator = UploadValidator::from_config(&config);

    let files = pipeline::collect_files(&cli.paths);
    if files.is_empty() {
        anyhow::bail!("No files found in the specified paths.");
    }

    if cli.rotate_only {
        let Some(out_dir) = cli.out_dir.as_deref() else {
            anyhow::bail!("--rotate-only needs --out-dir");
        };
        return rotate_all(&cli, &files, out_dir, &validator);
    }
    log::info!("Found {} file(s) to validate", files.len());

    let total = files.len();
    let mut reports = Vec::with_capacity(total);
    let mut errors = 0;

    for (i, path) in files.iter().enumerate() {
        log::debug!("[{}/{}] Validating: {}", i + 1, total, path.display());

        let content_type = cli.content_type.as_deref();
        match pipeline::validate_file(path, &validator, content_type, cli.out_dir.as_deref()) {
            Ok(report) => {
                if !cli.json {
                    print_report(&report);
                }
                reports.push(report);
            }
            Err(e) => {
                errors += 1;
                log::error!("{}: {e:#}", path.display());
            }
        }
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    // Summary
    let accepted = reports.iter().filter(|r| r.accepted).count();
    let rejected = reports.len() - accepted;
    log::info!(
        "Done: {accepted} accepted, {rejected} rejected, {errors} failed out of {total} files"
    );

    Ok(if accepted == total {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Write an upright copy of every sideways image into `out_dir`.
fn rotate_all(
    cli: &Cli,
    files: &[PathBuf],
    out_dir: &Path,
    validator: &UploadValidator,
) -> Result<ExitCode> {
    std::fs::create_dir_all(out_dir)?;
    let format = validator.output_format();
    log::info!("Found {} file(s) to rotate", files.len());

    let mut rotated = 0;
    let mut errors = 0;
    for path in files {
        let stem = path.file_stem().unwrap_or(path.as_os_str()).to_string_lossy();
        let target = out_dir.join(format!("{stem}{}", format.extension()));
        if target.exists() {
            errors += 1;
            log::error!("{}: {} already exists", path.display(), target.display());
            continue;
        }

        let codec = validator.codec();
        match pipeline::normalize_file(codec, path, &target, format, !cli.keep_tag) {
            Ok(transform) if transform.is_identity() => {
                println!("{DIM}upright{RESET}   {}", path.display());
            }
            Ok(transform) => {
                rotated += 1;
                let note = format!("{}  → {}", describe(transform), target.display());
                println!("{GREEN}rotated{RESET}   {}  {DIM}{note}{RESET}", path.display());
            }
            Err(e) => {
                errors += 1;
                log::error!("{}: {e:#}", path.display());
            }
        }
    }

    log::info!("Done: {rotated} rotated, {errors} failed out of {} files", files.len());
    Ok(if errors == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Print a one-line verdict for a file.
fn print_report(report: &FileReport) {
    let path = report.path.display();
    match report.reason {
        Some(reason) => println!("{RED}rejected{RESET}  {path}  {DIM}{}{RESET}", reason.code()),
        None => {
            let mut notes = Vec::new();
            if let Some(transform) = report.transform.filter(|t| !t.is_identity()) {
                notes.push(describe(transform).to_string());
            }
            if let Some(out) = &report.output_path {
                notes.push(format!("→ {}", out.display()));
            }
            println!("{GREEN}accepted{RESET}  {path}  {DIM}{}{RESET}", notes.join("  "));
        }
    }
}

fn describe(transform: GeometricTransform) -> &'static str {
    match transform {
        GeometricTransform::Identity => "upright",
        GeometricTransform::FlipHorizontal => "mirrored",
        GeometricTransform::Rotate180 => "rotated 180°",
        GeometricTransform::Rotate180FlipHorizontal => "rotated 180° and mirrored",
        GeometricTransform::Rotate90FlipHorizontal => "rotated 90° and mirrored",
        GeometricTransform::Rotate90 => "rotated 90°",
        GeometricTransform::Rotate270FlipHorizontal => "rotated 270° and mirrored",
        GeometricTransform::Rotate270 => "rotated 270°",
    }
}
