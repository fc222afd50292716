use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gps_strip::config::{self, WriteMode};
use gps_strip::pipeline::{self, FileOutcome, StripOptions};

#[derive(Parser, Debug)]
#[command(
    name = "gps-strip",
    version,
    about = "Strip GPS location metadata from JPEG photos without touching the image data"
)]
struct Cli {
    /// JPEG file or folder of JPEGs to process
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Where to write results (default: overwrite the input in place).
    /// For a single file, an existing folder or a path ending in `/` receives
    /// the file under its own name
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Report what would be stripped without writing any file
    #[arg(long)]
    dry_run: bool,

    /// Insert the cleaned metadata into the JPEG already at the output path
    #[arg(long)]
    insert: bool,

    /// Descend into subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Number of files processed at once (default: one per CPU)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[tokio::main]
async fn main() -> Result<ExitCode> {
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

    let Some(input) = cli.path.as_deref() else {
        anyhow::bail!("No input file or folder specified. Use --help for usage.");
    };

    // Load config, then let flags override it
    let config = config::Config::load(cli.config.as_deref())?;
    let mut options = StripOptions::from_config(&config);
    if cli.dry_run {
        options.dry_run = true;
    }
    if cli.insert {
        options.mode = WriteMode::InsertIntoExisting;
    }
    if cli.recursive {
        options.recursive = true;
    }
    if let Some(jobs) = cli.jobs {
        options.max_concurrency = jobs.max(1);
    }

    if options.mode == WriteMode::InsertIntoExisting && cli.output.is_none() {
        anyhow::bail!("--insert needs --output pointing at the JPEG(s) to receive the metadata.");
    }
    if options.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }

    let outcomes = if input.is_dir() {
        pipeline::strip_gps_from_folder(input, cli.output.as_deref(), &options)
            .await
            .with_context(|| format!("Failed to process folder {}", input.display()))?
    } else {
        let output = file_output(input, cli.output.as_deref());
        let result = pipeline::strip_gps_from_file(input, &output, &options);
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        vec![FileOutcome { file_name, result }]
    };

    if cli.json {
        print_json(&outcomes)?;
    } else {
        for outcome in &outcomes {
            print_status(outcome);
        }
    }

    // Summary
    let total = outcomes.len();
    let stripped = outcomes
        .iter()
        .filter(|o| matches!(&o.result, Ok(report) if report.had_gps))
        .count();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    let clean = total - stripped - failed;
    log::info!("Done: {stripped} stripped, {clean} without GPS, {failed} failed out of {total} files");

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Output path for a single file: the input itself, the given path, or the
/// input's name inside the given folder. The folder need not exist yet when
/// the path ends in a separator.
fn file_output(input: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        None => input.to_path_buf(),
        Some(dir) if names_folder(dir) => match input.file_name() {
            Some(name) => dir.join(name),
            None => dir.to_path_buf(),
        },
        Some(path) => path.to_path_buf(),
    }
}

fn names_folder(path: &Path) -> bool {
    path.is_dir()
        || path
            .as_os_str()
            .to_string_lossy()
            .chars()
            .last()
            .is_some_and(std::path::is_separator)
}

fn print_status(outcome: &FileOutcome) {
    match &outcome.result {
        Ok(report) if report.had_gps => println!("{GREEN}{}{RESET}", outcome.file_name),
        Ok(_) => println!("{} {DIM}- no GPS{RESET}", outcome.file_name),
        Err(e) => println!("{RED}{} - {e}{RESET}", outcome.file_name),
    }
}

fn print_json(outcomes: &[FileOutcome]) -> Result<()> {
    let json_results: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(report) => serde_json::json!({
                "file": o.file_name,
                "had_gps": report.had_gps,
                "error": null,
            }),
            Err(e) => serde_json::json!({
                "file": o.file_name,
                "had_gps": false,
                "error": {
                    "kind": e.kind(),
                    "message": e.to_string(),
                },
            }),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_results)?);
    Ok(())
}
