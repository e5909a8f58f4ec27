//! Thumbnail cache for incremental runs.
//!
//! Decoding and resampling full-size coin photos is the slow part of the
//! thumbnail job. This module lets it skip images whose source bytes and
//! thumbnail settings have not changed since the last run.
//!
//! ## Cache keys
//!
//! Thumbnails mirror the image tree, so the manifest is keyed by the
//! `/`-separated relative path shared by an image and its thumbnail.
//! Each entry records:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` (which resets
//!   modification times).
//! - **`params_hash`**: SHA-256 of the thumbnail settings (bounding box,
//!   quality). Changing either in `coins.toml` regenerates everything.
//!
//! ## Lookup outcomes
//!
//! | Thumbnail on disk | Manifest entry | Outcome |
//! |---|---|---|
//! | no | any | [`CacheStatus::Miss`] |
//! | yes | matching | [`CacheStatus::Hit`] |
//! | yes | none | [`CacheStatus::Untracked`] (adopted as-is) |
//! | yes | different hashes | [`CacheStatus::Miss`] |
//!
//! Untracked thumbnails are ones made before the cache existed (or copied in
//! by hand). They are kept and recorded rather than regenerated.
//!
//! ## Storage
//!
//! The manifest is `<thumbnails>/.thumb-cache.json`. Being a dotfile it is
//! never mistaken for a thumbnail or served as one.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the cache manifest file within the thumbnail root.
const MANIFEST_FILENAME: &str = ".thumb-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached thumbnail.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// Result of looking up a thumbnail in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Thumbnail exists and was made from these exact bytes and settings.
    Hit,
    /// Thumbnail exists but the manifest has never seen it.
    Untracked,
    /// Thumbnail is missing or out of date.
    Miss,
}

/// On-disk manifest mapping relative paths to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--force` or first run).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load from the thumbnail root. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(thumbnails_root: &Path) -> Self {
        let path = manifest_path(thumbnails_root);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "discarding unreadable thumbnail cache");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest
    }

    /// Save to the thumbnail root.
    pub fn save(&self, thumbnails_root: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(thumbnails_root), json)
    }

    /// Decide whether the thumbnail at `rel_path` needs to be (re)made.
    pub fn lookup(
        &self,
        rel_path: &str,
        source_hash: &str,
        params_hash: &str,
        thumbnails_root: &Path,
    ) -> CacheStatus {
        if !thumbnails_root.join(rel_path).is_file() {
            return CacheStatus::Miss;
        }
        match self.entries.get(rel_path) {
            None => CacheStatus::Untracked,
            Some(e) if e.source_hash == source_hash && e.params_hash == params_hash => {
                CacheStatus::Hit
            }
            Some(_) => CacheStatus::Miss,
        }
    }

    /// Record the hashes a thumbnail was made (or adopted) with.
    pub fn insert(&mut self, rel_path: String, source_hash: String, params_hash: String) {
        self.entries.insert(
            rel_path,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    /// Drop entries whose source image no longer exists.
    pub fn retain_live(&mut self, live: &HashSet<String>) {
        self.entries.retain(|rel, _| live.contains(rel));
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// SHA-256 hash of the thumbnail settings.
///
/// Inputs: bounding box edge and quality. If either changes, every
/// thumbnail is regenerated.
pub fn hash_thumbnail_params(max_size: u32, quality: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"thumbnail\0");
    hasher.update(max_size.to_le_bytes());
    hasher.update(quality.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Summary of cache performance for a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub adopted: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn record(&mut self, status: CacheStatus) {
        match status {
            CacheStatus::Hit => self.hits += 1,
            CacheStatus::Untracked => self.adopted += 1,
            CacheStatus::Miss => self.misses += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.hits + self.adopted + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 || self.adopted > 0 {
            if self.adopted > 0 {
                write!(
                    f,
                    "{} cached, {} adopted, {} generated ({} total)",
                    self.hits,
                    self.adopted,
                    self.misses,
                    self.total()
                )
            } else {
                write!(
                    f,
                    "{} cached, {} generated ({} total)",
                    self.hits,
                    self.misses,
                    self.total()
                )
            }
        } else {
            write!(f, "{} generated", self.misses)
        }
    }
}

/// Resolve the cache manifest path for a thumbnail root.
pub fn manifest_path(thumbnails_root: &Path) -> PathBuf {
    thumbnails_root.join(MANIFEST_FILENAME)
}
