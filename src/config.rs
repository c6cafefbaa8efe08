//! Tool configuration.
//!
//! Handles loading, validating, and merging `pixelcraft.toml`. Stock defaults
//! form the base layer; a user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [filters]
//! default_filter = "average"   # Used when --filter is omitted
//! default_sensitivity = 16     # Used when --sensitivity is omitted
//!
//! [processing]
//! canonical_size = [450, 450]  # Every loaded image is resized to this (width, height)
//! max_threads = 4              # Threads for convolution rows (omit for auto = CPU cores)
//!
//! [output]
//! directory = "output"         # Where apply and batch write results
//! ```
//!
//! ## Partial Configuration
//!
//! ```toml
//! # Only change the default filter
//! [filters]
//! default_filter = "sharpen"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::filters::{FilterError, FilterKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pixelcraft.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `pixelcraft.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Filter and comparison defaults.
    pub filters: FiltersConfig,
    /// Loader size and thread settings.
    pub processing: ProcessingConfig,
    /// Output location.
    pub output: OutputConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filters
            .default_filter()
            .map_err(|e| ConfigError::Validation(format!("filters.default_filter: {e}")))?;
        if self.filters.default_sensitivity == 0 {
            return Err(ConfigError::Validation(
                "filters.default_sensitivity must be positive".into(),
            ));
        }
        if self.processing.canonical_size[0] == 0 || self.processing.canonical_size[1] == 0 {
            return Err(ConfigError::Validation(
                "processing.canonical_size values must be non-zero".into(),
            ));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersConfig {
    /// Filter name, case-insensitive.
    pub default_filter: String,
    /// Similarity sensitivity; tolerance is `round(255 / sensitivity)`.
    pub default_sensitivity: u32,
}

impl FiltersConfig {
    pub fn default_filter(&self) -> Result<FilterKind, FilterError> {
        self.default_filter.parse()
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            default_filter: FilterKind::Average.name().to_string(),
            default_sensitivity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Loader resize target as `[width, height]`.
    pub canonical_size: [u32; 2],
    /// Maximum number of threads used for convolution.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            canonical_size: [450, 450],
            max_threads: None,
        }
    }
}

/// Worker count for the convolution pool.
///
/// `max_threads` only ever lowers the machine's core count; when unset every
/// core is used. Falls back to one thread if the core count is unknown.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_threads {
        Some(limit) => limit.min(cores),
        None => cores,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Lay a sparse user table over the stock one.
///
/// Nested tables combine per key, so a file that sets only
/// `[processing] max_threads` keeps every other default. Any other value,
/// arrays included, is taken from the user file as is.
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

/// Read a config file as a raw TOML value, or `None` if it does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    resolve_config(overlay)
}

/// Returns a fully-commented stock `pixelcraft.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pixelcraft configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Filters
# ---------------------------------------------------------------------------
[filters]
# Filter used when --filter is omitted.
# One of: average, sharpen, negative, laplacian, logarithm (case-insensitive)
default_filter = "average"

# Sensitivity used when --sensitivity is omitted. Must be positive.
# Two samples match when they differ by at most round(255 / sensitivity),
# so a LARGER number means a STRICTER comparison.
# Conventional values: 1, 2, 4, 16, 32, 64, 128, 255
default_sensitivity = 16

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Every loaded image is converted to grayscale and resized to [width, height].
canonical_size = [450, 450]

# Maximum threads used for convolution rows.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_threads = 4

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory that apply and batch write results to (created if absent).
directory = "output"
"##
}
