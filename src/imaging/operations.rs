//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{Quality, ThumbnailParams};
use crate::config::ThumbnailsConfig;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Configuration for thumbnail generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Edge of the square bounding box.
    pub max_size: u32,
    pub quality: Quality,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_size: 400,
            quality: Quality::default(),
        }
    }
}

impl From<&ThumbnailsConfig> for ThumbnailConfig {
    fn from(config: &ThumbnailsConfig) -> Self {
        Self {
            max_size: config.max_size,
            quality: Quality::new(config.quality),
        }
    }
}

/// Plan a thumbnail operation without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    original: (u32, u32),
    config: &ThumbnailConfig,
) -> ThumbnailParams {
    let (width, height) = calculate_fit_dimensions(original, config.max_size);

    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality: config.quality,
    }
}

/// Create a thumbnail of `source` at `output`.
///
/// The output's parent directory must already exist. Returns the dimensions
/// that were written.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    config: &ThumbnailConfig,
) -> Result<(u32, u32)> {
    let original = get_dimensions(backend, source)?;
    let params = plan_thumbnail(source, output, original, config);
    backend.thumbnail(&params)?;
    Ok((params.width, params.height))
}
