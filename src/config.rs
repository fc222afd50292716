use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for gps-strip.
///
/// Every section falls back to its defaults when missing from the file, so a
/// config only needs the keys it changes.
///
/// # Loading
///
/// ```rust,no_run
/// use gps_strip::config::{Config, WriteMode};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.write_mode = WriteMode::InsertIntoExisting;
/// config.batch.max_concurrency = 2;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How and whether files are written.
    pub output: OutputConfig,
    /// Folder processing.
    pub batch: BatchConfig,
}

/// Where the stripped metadata ends up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Rebuild the source image with the stripped metadata.
    #[default]
    Original,
    /// Put the stripped metadata into the JPEG already at the output path,
    /// keeping that file's image data.
    InsertIntoExisting,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, report what would be stripped without modifying any files.
    pub dry_run: bool,
    pub write_mode: WriteMode,
    /// If `true`, keep a `.bak` copy before overwriting a file in place.
    pub backup_originals: bool,
}

/// Folder batch configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Files processed at once; `0` means one per available CPU.
    pub max_concurrency: usize,
    /// Descend into subdirectories, mirroring them under the output folder.
    pub recursive: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            write_mode: WriteMode::Original,
            backup_originals: false,
        }
    }
}

/// File name looked up next to the executable when no path is given.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// `requested` tasks, or one per available CPU when `requested` is `0`.
pub fn concurrency_limit(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    /// Default config location: [`CONFIG_FILE_NAME`] beside the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Cannot locate the gps-strip executable")?;
        let dir = exe
            .parent()
            .context("The gps-strip executable has no parent directory")?;
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    fn resolve(path: Option<&Path>) -> Result<PathBuf> {
        path.map_or_else(Self::config_path, |p| Ok(p.to_path_buf()))
    }

    /// Read the config at `path` (or [`Config::config_path`]).
    ///
    /// A missing file is not an error: defaults are used and a warning logged.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve(path)?;
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read config {}", path.display()));
            }
        };

        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        log::debug!("Loaded config from {}: {config:?}", path.display());
        Ok(config)
    }

    /// Write the config as pretty JSON to `path` (or [`Config::config_path`]).
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = Self::resolve(path)?;
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }
}
