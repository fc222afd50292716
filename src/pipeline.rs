use serde::Serialize;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::config::{Config, concurrency_limit};
pub use crate::config::WriteMode;
use crate::error::{Result, StripError};
use crate::exif::{self, jpeg};

/// Extensions treated as JPEG, compared case-insensitively.
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// The file carried GPS data, now removed (or, in a dry run, that would be).
    pub had_gps: bool,
}

/// The result for one file of a folder batch.
#[derive(Debug)]
pub struct FileOutcome {
    /// Path relative to the input folder.
    pub file_name: String,
    pub result: Result<FileReport>,
}

/// Knobs for the file and folder entry points, usually built from a
/// [`Config`] plus CLI overrides.
#[derive(Debug, Clone, Default)]
pub struct StripOptions {
    pub mode: WriteMode,
    pub dry_run: bool,
    pub backup_originals: bool,
    pub recursive: bool,
    /// `0` means one task per available CPU.
    pub max_concurrency: usize,
}

impl StripOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: config.output.write_mode,
            dry_run: config.output.dry_run,
            backup_originals: config.output.backup_originals,
            recursive: config.batch.recursive,
            max_concurrency: config.batch.max_concurrency,
        }
    }
}

/// Check if a file has a JPEG extension.
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Collect the JPEG files of a folder, sorted by file name.
///
/// Only the folder itself is listed unless `recursive` is set. Entries that
/// cannot be read are logged and skipped.
pub fn collect_jpegs(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(StripError::PathNotFound(dir.to_path_buf()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {e}", dir.display());
                continue;
            }
        };
        if entry.file_type().is_file() && is_jpeg(entry.path()) {
            images.push(entry.into_path());
        }
    }

    Ok(images)
}

/// `photo.jpg` → `photo.jpg.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Copy a photo aside before it is overwritten. An existing backup is left
/// alone, so it always holds the first version seen.
fn backup_original(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    if backup.exists() {
        log::debug!("Keeping existing backup {}", backup.display());
        return Ok(backup);
    }
    std::fs::copy(path, &backup).map_err(|e| StripError::io(&backup, e))?;
    log::debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(backup)
}

/// Write `bytes` to a temp file next to `path`, then rename it over `path`.
///
/// The result gets the permissions of `like` (the file being replaced, or the
/// source it was made from), not the owner-only mode of a fresh temp file.
/// Readers never see a partial file; on failure the temp file is removed.
fn write_atomic(path: &Path, bytes: &[u8], like: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir).map_err(|e| StripError::io(dir, e))?;
    temp_file
        .write_all(bytes)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|e| StripError::io(temp_file.path(), e))?;

    let permissions = std::fs::metadata(like)
        .map_err(|e| StripError::io(like, e))?
        .permissions();
    temp_file
        .as_file()
        .set_permissions(permissions)
        .map_err(|e| StripError::io(temp_file.path(), e))?;

    temp_file
        .persist(path)
        .map_err(|e| StripError::io(path, e.error))?;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(StripError::PathNotFound(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|e| StripError::io(path, e))
}

/// Strip GPS data from one JPEG.
///
/// With [`WriteMode::Original`] the source file is rebuilt with cleaned
/// metadata and written to `output`, which may equal `input`. A file without
/// GPS is still copied to a different `output`; in place it is left alone.
///
/// With [`WriteMode::InsertIntoExisting`] the cleaned metadata of `input` is
/// put into the JPEG already at `output`, whose image data is kept. A source
/// without Exif leaves `output` untouched.
///
/// A dry run does everything except writing.
///
/// # Example
///
/// ```rust,no_run
/// use gps_strip::pipeline::{StripOptions, strip_gps_from_file};
/// use std::path::Path;
///
/// let options = StripOptions { dry_run: true, ..Default::default() };
/// let report = strip_gps_from_file(Path::new("a.jpg"), Path::new("a.jpg"), &options).unwrap();
/// println!("would strip: {}", report.had_gps);
/// ```
pub fn strip_gps_from_file(input: &Path, output: &Path, options: &StripOptions) -> Result<FileReport> {
    let source = read_file(input)?;

    match options.mode {
        WriteMode::Original => {
            let outcome = exif::strip_gps_from_bytes(&source)?;
            let report = FileReport {
                had_gps: outcome.had_gps,
            };
            if options.dry_run {
                return Ok(report);
            }

            let in_place = same_file(input, output);
            if in_place && !outcome.had_gps {
                log::debug!("{} has no GPS data, leaving it as is", input.display());
                return Ok(report);
            }
            if in_place && options.backup_originals {
                backup_original(input)?;
            }
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| StripError::io(parent, e))?;
            }
            write_atomic(output, &outcome.bytes, input)?;
            Ok(report)
        }
        WriteMode::InsertIntoExisting => {
            let Some(stripped) = exif::extract_stripped_exif(&source)? else {
                log::debug!("{} has no Exif segment, nothing to insert", input.display());
                return Ok(FileReport { had_gps: false });
            };
            let report = FileReport {
                had_gps: stripped.had_gps,
            };

            let target = read_file(output)?;
            let bytes = jpeg::insert_exif(&target, &stripped.tiff)?;
            if options.dry_run {
                return Ok(report);
            }
            if options.backup_originals {
                backup_original(output)?;
            }
            write_atomic(output, &bytes, output)?;
            Ok(report)
        }
    }
}

/// Strip GPS data from every JPEG in a folder.
///
/// Files are processed on blocking worker threads, at most
/// `options.max_concurrency` at once. A failing file is reported in its
/// [`FileOutcome`] and the batch carries on; outcomes come back in file-name
/// order. Output goes to `output_dir` (created if needed), or back into
/// `input_dir` when `None`. Only an unreadable `input_dir` or an output
/// folder that cannot be created fail the whole call.
pub async fn strip_gps_from_folder(
    input_dir: &Path,
    output_dir: Option<&Path>,
    options: &StripOptions,
) -> Result<Vec<FileOutcome>> {
    let files = collect_jpegs(input_dir, options.recursive)?;
    let output_dir = output_dir.unwrap_or(input_dir).to_path_buf();
    if !options.dry_run {
        std::fs::create_dir_all(&output_dir).map_err(|e| StripError::io(&output_dir, e))?;
    }

    let total = files.len();
    log::info!("Found {total} JPEG file(s) in {}", input_dir.display());

    let semaphore = Arc::new(Semaphore::new(concurrency_limit(options.max_concurrency)));
    let mut tasks = JoinSet::new();
    let mut names = Vec::with_capacity(total);

    for (index, input) in files.into_iter().enumerate() {
        let relative = input
            .strip_prefix(input_dir)
            .unwrap_or(&input)
            .to_path_buf();
        let file_name = relative.to_string_lossy().into_owned();
        names.push(file_name.clone());

        let output = output_dir.join(&relative);
        let options = options.clone();
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        tasks.spawn_blocking(move || {
            let _permit = permit;
            log::info!("[{}/{total}] Processing: {file_name}", index + 1);
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                strip_gps_from_file(&input, &output, &options)
            }))
            .unwrap_or_else(|_| {
                Err(StripError::io(
                    &input,
                    std::io::Error::other("worker panicked"),
                ))
            });

            match &result {
                Ok(report) if report.had_gps => log::info!("  GPS removed: {file_name}"),
                Ok(_) => log::info!("  No GPS data: {file_name}"),
                Err(e) => log::error!("  Failed {file_name}: {e}"),
            }
            (index, result)
        });
    }

    let mut results: Vec<Option<Result<FileReport>>> = names.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, result)) => results[index] = Some(result),
            Err(e) => log::error!("Worker task failed: {e}"),
        }
    }

    Ok(names
        .into_iter()
        .zip(results)
        .map(|(file_name, result)| {
            let result = result.unwrap_or_else(|| {
                Err(StripError::io(
                    input_dir.join(&file_name),
                    std::io::Error::other("worker did not finish"),
                ))
            });
            FileOutcome { file_name, result }
        })
        .collect())
}
