//! Archive configuration.
//!
//! Handles loading, validating, and merging the `coins.toml` file. The file is
//! optional and sparse: stock defaults are the base layer and the user file
//! only overrides what it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! images_dir = "images"          # Collection root (category/series/year/coin/subtype)
//! thumbnails_dir = "thumbnails"  # Mirrored thumbnail tree
//! static_dir = "static"          # Browser renderer assets served under /static/
//! dictionary = "folder_map.json" # Hebrew → English dictionary
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080                    # The PORT environment variable wins
//!
//! [scan]
//! categories = true              # false = series folders directly under the root
//! untagged_label = "ללא תיוג"    # Subtype label for loose images next to subtypes
//! reserved = ["thumbnails", "static"]
//!
//! [thumbnails]
//! max_size = 400                 # Bounding box edge in pixels
//! quality = 85                   # JPEG quality (1-100)
//!
//! [processing]
//! max_processes = 4              # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "coins.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Archive configuration loaded from `coins.toml`.
///
/// All fields have defaults matching the conventional project layout:
/// `images/`, `thumbnails/` and `folder_map.json` next to each other in the
/// working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Root of the collection tree.
    pub images_dir: String,
    /// Root of the mirrored thumbnail tree.
    pub thumbnails_dir: String,
    /// Directory holding the browser renderer (JS/CSS).
    pub static_dir: String,
    /// Path to the original → translated dictionary file.
    pub dictionary: String,
    pub server: ServerConfig,
    pub scan: ScanConfig,
    pub thumbnails: ThumbnailsConfig,
    pub processing: ProcessingConfig,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            images_dir: "images".to_string(),
            thumbnails_dir: "thumbnails".to_string(),
            static_dir: "static".to_string(),
            dictionary: "folder_map.json".to_string(),
            server: ServerConfig::default(),
            scan: ScanConfig::default(),
            thumbnails: ThumbnailsConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl ArchiveConfig {
    pub fn images_root(&self) -> PathBuf {
        PathBuf::from(&self.images_dir)
    }

    pub fn thumbnails_root(&self) -> PathBuf {
        PathBuf::from(&self.thumbnails_dir)
    }

    pub fn static_root(&self) -> PathBuf {
        PathBuf::from(&self.static_dir)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        PathBuf::from(&self.dictionary)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thumbnails.max_size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.max_size must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        if self.scan.untagged_label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "scan.untagged_label must not be empty".into(),
            ));
        }
        if self.images_dir.is_empty() {
            return Err(ConfigError::Validation(
                "images_dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Apply the `PORT` environment variable on top of the file value.
    ///
    /// Takes the raw variable so it can be tested without touching the
    /// process environment.
    pub fn apply_port_override(&mut self, raw: Option<&str>) -> Result<(), ConfigError> {
        if let Some(raw) = raw {
            let port = raw.trim().parse::<u16>().map_err(|_| {
                ConfigError::Validation(format!("PORT must be a port number, got {raw:?}"))
            })?;
            self.server.port = port;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Collection layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Whether the root holds category folders above the series level.
    pub categories: bool,
    /// Subtype label given to loose coin images when subtype folders also exist.
    pub untagged_label: String,
    /// Root-level folder names that are never collection groups.
    pub reserved: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            categories: true,
            untagged_label: "ללא תיוג".to_string(),
            reserved: vec!["thumbnails".to_string(), "static".to_string()],
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Edge of the bounding box thumbnails are fitted into.
    pub max_size: u32,
    /// JPEG encoding quality. Other formats are lossless or fixed.
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            max_size: 400,
            quality: 85,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel thumbnail workers.
    /// When absent, defaults to the number of CPU cores.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ArchiveConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but is
/// not valid TOML. Unlike sidecar metadata, the config is not fail-open: a
/// typo should stop the server rather than silently serve defaults.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ArchiveConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ArchiveConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, falling back to defaults when it is absent.
pub fn load_config(path: &Path) -> Result<ArchiveConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock `coins.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Coin Archive Configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Relative paths are resolved against the working directory.
# Unknown keys will cause an error.

# Collection root: category/series/year/coin/subtype folders.
images_dir = "images"

# Thumbnails mirror the collection tree at identical relative paths.
thumbnails_dir = "thumbnails"

# Browser renderer assets, served under /static/.
static_dir = "static"

# Original -> translated dictionary (flat JSON object).
dictionary = "folder_map.json"

# ---------------------------------------------------------------------------
# HTTP server
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
# The PORT environment variable overrides this value.
port = 8080

# ---------------------------------------------------------------------------
# Collection layout
# ---------------------------------------------------------------------------
[scan]
# true:  images/<category>/<series>/<year>/<coin>/<subtype>
# false: images/<series>/<year>/<coin>/<subtype>
categories = true

# Subtype label for loose coin images that sit next to subtype folders.
untagged_label = "ללא תיוג"

# Root-level folders that are never treated as collection groups.
reserved = ["thumbnails", "static"]

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Thumbnails fit inside a max_size x max_size box, aspect ratio preserved.
max_size = 400

# JPEG encoding quality (1 = worst, 100 = best).
quality = 85

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel thumbnail workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
