//! kcfile-sniff CLI
//!
//! Command-line tool for identifying KC85, Z9001, Z1013 and AC1 program
//! files and extracting their memory images.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use kcfile::formatter::{HumanFormatter, JsonFormatter, ReportFormatter, ShortFormatter};
use kcfile::{analyze, read_file, ClassifierOptions, FileReport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Home computer program file sniffer.
///
/// Recognizes Headersave, KC-TAP, KCC, KCB, KC-BASIC, Intel HEX and
/// related files and shows their load address, end address, entry
/// point and name.
#[derive(Parser, Debug)]
#[command(name = "kcfile-sniff")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "human")]
    format: OutputFormat,

    /// Write each program image as raw bytes into this directory
    #[arg(short = 'x', long, value_name = "DIR")]
    extract: Option<PathBuf>,

    /// List chained KC-TAP containers
    #[arg(short, long)]
    subfiles: bool,

    /// Ignore file name extensions, use signatures only
    #[arg(long, env = "KCFILE_NO_FILENAME")]
    no_filename: bool,

    /// Descend into directories (needs the `batch` feature)
    #[arg(short, long)]
    recursive: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (one line per file)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// Compact tab-separated output
    Short,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging if verbose
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("kcfile=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let options = ClassifierOptions {
        use_filename: !args.no_filename,
        ..ClassifierOptions::new()
    };
    let formatter = make_formatter(&args);
    let paths = collect_paths(&args);
    let results = run_all(&paths, &options, &args, formatter.as_ref());

    let mut success = true;
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(output) => print!("{output}"),
            Err(e) => {
                if !args.quiet {
                    eprintln!("Error analyzing {}: {:#}", path.display(), e);
                }
                success = false;
            }
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn make_formatter(args: &Args) -> Box<dyn ReportFormatter + Sync> {
    match args.format {
        OutputFormat::Human if args.quiet => Box::new(HumanFormatter::quiet()),
        OutputFormat::Human if args.verbose => Box::new(HumanFormatter::verbose()),
        OutputFormat::Human => Box::new(HumanFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
        OutputFormat::Short => Box::new(ShortFormatter::new()),
    }
}

#[cfg(feature = "batch")]
fn collect_paths(args: &Args) -> Vec<PathBuf> {
    if !args.recursive {
        return args.files.clone();
    }
    let mut paths = Vec::new();
    for root in &args.files {
        for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => tracing::warn!(root = %root.display(), error = %e, "skipping entry"),
            }
        }
    }
    paths
}

#[cfg(not(feature = "batch"))]
fn collect_paths(args: &Args) -> Vec<PathBuf> {
    if args.recursive {
        tracing::warn!("--recursive needs the batch feature, directories are not expanded");
    }
    args.files.clone()
}

#[cfg(feature = "batch")]
fn run_all(
    paths: &[PathBuf],
    options: &ClassifierOptions,
    args: &Args,
    formatter: &(dyn ReportFormatter + Sync),
) -> Vec<Result<String>> {
    use rayon::prelude::*;
    paths
        .par_iter()
        .map(|path| process_file(path, options, args, formatter))
        .collect()
}

#[cfg(not(feature = "batch"))]
fn run_all(
    paths: &[PathBuf],
    options: &ClassifierOptions,
    args: &Args,
    formatter: &(dyn ReportFormatter + Sync),
) -> Vec<Result<String>> {
    paths
        .iter()
        .map(|path| process_file(path, options, args, formatter))
        .collect()
}

fn process_file(
    path: &Path,
    options: &ClassifierOptions,
    args: &Args,
    formatter: &(dyn ReportFormatter + Sync),
) -> Result<String> {
    let data = read_file(path, options).with_context(|| format!("reading {}", path.display()))?;
    let name = path.file_name().and_then(|n| n.to_str());
    let mut report = analyze(&data, name, options);

    if let Some(ref dir) = args.extract {
        write_image(dir, path, &report)?;
    }
    if !args.subfiles {
        report.subfiles.clear();
    }

    Ok(formatter.format_report(&report, path))
}

/// Write the image to `<dir>/<stem>_<load address>.bin`.
fn write_image(dir: &Path, path: &Path, report: &FileReport) -> Result<PathBuf> {
    let Some(ref image) = report.image else {
        bail!(
            "no program image: {}",
            report.load_error.as_deref().unwrap_or("unknown format")
        );
    };
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let out = dir.join(format!("{stem}_{:04X}.bin", image.beg_addr));
    std::fs::write(&out, &image.payload).with_context(|| format!("writing {}", out.display()))?;
    tracing::info!(path = %out.display(), len = image.len(), "extracted program image");
    Ok(out)
}
