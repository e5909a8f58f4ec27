//! Thumbnail generation.
//!
//! Mirrors every collection image into the thumbnail root at the identical
//! relative path, scaled down to fit a square bounding box. The scanner's
//! `thumb_available` flag is nothing more than "does the mirrored file
//! exist", so the layout here is the contract:
//!
//! ```text
//! images/מחזור/שקל חדש/1994/שקל/01.jpg
//! thumbnails/מחזור/שקל חדש/1994/שקל/01.jpg   # ≤ 400×400, still JPEG
//! thumbnails/.thumb-cache.json                # see crate::cache
//! ```
//!
//! ## Sizing
//!
//! Aspect ratio is preserved and small images are never upscaled; see
//! [`calculate_fit_dimensions`](crate::imaging::calculate_fit_dimensions).
//! Output keeps the source's format and extension.
//!
//! ## Skipping
//!
//! Thumbnails that are up to date (or that predate the cache and are simply
//! present) are left alone. `--force` regenerates everything.
//!
//! ## Failures
//!
//! A corrupt or unreadable image is logged, counted and skipped. It never
//! aborts the rest of the batch.
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel using [rayon](https://docs.rs/rayon).
//! Progress is reported as [`ThumbnailEvent`]s over an optional channel so
//! the CLI can print while workers run.

use crate::cache::{self, CacheManifest, CacheStats, CacheStatus};
use crate::config::ArchiveConfig;
use crate::imaging::{ImageBackend, RustBackend, ThumbnailConfig, create_thumbnail};
use crate::scan::is_image_name;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image root not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Everything one thumbnail run needs.
#[derive(Debug, Clone)]
pub struct ThumbnailJob {
    pub images_root: PathBuf,
    pub thumbnails_root: PathBuf,
    /// Top-level names under the image root that are not walked.
    pub reserved: Vec<String>,
    pub config: ThumbnailConfig,
    /// Ignore the cache and existing files.
    pub force: bool,
}

impl ThumbnailJob {
    pub fn from_config(config: &ArchiveConfig, force: bool) -> Self {
        Self {
            images_root: config.images_root(),
            thumbnails_root: config.thumbnails_root(),
            reserved: config.scan.reserved.clone(),
            config: ThumbnailConfig::from(&config.thumbnails),
            force,
        }
    }
}

/// Progress reported while a run is underway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailEvent {
    Started {
        total: usize,
    },
    Generated {
        rel_path: String,
        width: u32,
        height: u32,
    },
    Skipped {
        rel_path: String,
        status: CacheStatus,
    },
    Failed {
        rel_path: String,
        error: String,
    },
}

/// Counts for a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailReport {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cache: CacheStats,
}

impl ThumbnailReport {
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed
    }
}

enum Outcome {
    Generated {
        source_hash: String,
        dims: (u32, u32),
    },
    Skipped {
        source_hash: String,
        status: CacheStatus,
    },
    Failed(String),
}

pub fn generate_thumbnails(
    job: &ThumbnailJob,
    progress: Option<Sender<ThumbnailEvent>>,
) -> Result<ThumbnailReport, ThumbnailError> {
    generate_with_backend(&RustBackend::new(), job, progress)
}

/// Generate thumbnails using a specific backend (allows testing with mock).
pub fn generate_with_backend(
    backend: &impl ImageBackend,
    job: &ThumbnailJob,
    progress: Option<Sender<ThumbnailEvent>>,
) -> Result<ThumbnailReport, ThumbnailError> {
    let sources = collect_sources(job)?;
    std::fs::create_dir_all(&job.thumbnails_root)?;

    let mut manifest = if job.force {
        CacheManifest::empty()
    } else {
        CacheManifest::load(&job.thumbnails_root)
    };
    let params_hash = cache::hash_thumbnail_params(job.config.max_size, job.config.quality.value());

    info!(total = sources.len(), force = job.force, "generating thumbnails");
    emit(&progress, ThumbnailEvent::Started {
        total: sources.len(),
    });

    let outcomes: Vec<(String, Outcome)> = sources
        .par_iter()
        .map(|rel| {
            let outcome = process_one(backend, job, &manifest, rel, &params_hash);
            emit(&progress, event_for(rel, &outcome));
            (rel.clone(), outcome)
        })
        .collect();

    let mut report = ThumbnailReport::default();
    for (rel, outcome) in outcomes {
        match outcome {
            Outcome::Generated { source_hash, .. } => {
                report.created += 1;
                report.cache.record(CacheStatus::Miss);
                manifest.insert(rel, source_hash, params_hash.clone());
            }
            Outcome::Skipped {
                source_hash,
                status,
            } => {
                report.skipped += 1;
                report.cache.record(status);
                manifest.insert(rel, source_hash, params_hash.clone());
            }
            Outcome::Failed(_) => report.failed += 1,
        }
    }

    let live: HashSet<String> = sources.into_iter().collect();
    manifest.retain_live(&live);
    manifest.save(&job.thumbnails_root)?;

    info!(
        created = report.created,
        skipped = report.skipped,
        failed = report.failed,
        "thumbnails done"
    );
    Ok(report)
}

/// Relative paths of every image under the root, sorted.
///
/// Hidden entries are skipped at every depth; reserved names only at the top.
pub fn collect_sources(job: &ThumbnailJob) -> Result<Vec<String>, ThumbnailError> {
    let root = &job.images_root;
    if !root.is_dir() {
        return Err(ThumbnailError::SourceNotFound(root.clone()));
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if name.starts_with('.') || e.path() == job.thumbnails_root {
                return false;
            }
            !(e.depth() == 1 && job.reserved.iter().any(|r| *r == name))
        });

    let mut sources = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_image_name(name) {
            continue;
        }
        if let Some(rel) = relative_path(root, entry.path()) {
            sources.push(rel);
        }
    }
    Ok(sources)
}

/// `/`-joined path of `path` below `root`, `None` for non UTF-8 paths.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn process_one(
    backend: &impl ImageBackend,
    job: &ThumbnailJob,
    manifest: &CacheManifest,
    rel: &str,
    params_hash: &str,
) -> Outcome {
    let source = job.images_root.join(rel);
    let output = job.thumbnails_root.join(rel);

    let source_hash = match cache::hash_file(&source) {
        Ok(h) => h,
        Err(e) => return failed(rel, format!("cannot read source: {e}")),
    };

    let status = if job.force {
        CacheStatus::Miss
    } else {
        manifest.lookup(rel, &source_hash, params_hash, &job.thumbnails_root)
    };
    if status != CacheStatus::Miss {
        debug!(path = rel, ?status, "thumbnail up to date");
        return Outcome::Skipped {
            source_hash,
            status,
        };
    }

    if let Some(parent) = output.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        return failed(rel, format!("cannot create {}: {e}", parent.display()));
    }

    match create_thumbnail(backend, &source, &output, &job.config) {
        Ok(dims) => Outcome::Generated { source_hash, dims },
        Err(e) => failed(rel, e.to_string()),
    }
}

fn failed(rel: &str, error: String) -> Outcome {
    warn!(path = rel, error = %error, "thumbnail failed");
    Outcome::Failed(error)
}

fn event_for(rel: &str, outcome: &Outcome) -> ThumbnailEvent {
    let rel_path = rel.to_string();
    match outcome {
        Outcome::Generated { dims, .. } => ThumbnailEvent::Generated {
            rel_path,
            width: dims.0,
            height: dims.1,
        },
        Outcome::Skipped { status, .. } => ThumbnailEvent::Skipped {
            rel_path,
            status: *status,
        },
        Outcome::Failed(error) => ThumbnailEvent::Failed {
            rel_path,
            error: error.clone(),
        },
    }
}

fn emit(progress: &Option<Sender<ThumbnailEvent>>, event: ThumbnailEvent) {
    if let Some(tx) = progress {
        // Receiver gone means nobody is printing; the run itself continues.
        tx.send(event).ok();
    }
}
