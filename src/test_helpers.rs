//! Shared test utilities for the coin-archive test suite.
//!
//! Provides a throwaway workspace with the conventional layout (`images/`,
//! `thumbnails/`, `folder_map.json`) and lookup helpers over scanned entries.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let ws = Workspace::new();
//! ws.image("מחזור/שקל חדש/1994/שקל/01.jpg")
//!     .details("מחזור/שקל חדש/1994/שקל", r#"{"weight": "4g"}"#);
//!
//! let collection = ws.scan();
//! let shekel = find_entry(&collection.entries, "שקל", None);
//! assert!(shekel.has_image);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::ArchiveConfig;
use crate::scan::{CATEGORY_LAYOUT, Collection, ScanOptions, scan};
use crate::types::CollectionEntry;

// =========================================================================
// Workspace setup
// =========================================================================

/// A temp directory laid out like a deployment of the archive.
pub struct Workspace {
    pub tmp: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("images")).unwrap();
        Self { tmp }
    }

    pub fn images(&self) -> PathBuf {
        self.tmp.path().join("images")
    }

    pub fn thumbnails(&self) -> PathBuf {
        self.tmp.path().join("thumbnails")
    }

    pub fn dictionary(&self) -> PathBuf {
        self.tmp.path().join("folder_map.json")
    }

    /// Create a placeholder file at `rel` under the image root.
    pub fn image(&self, rel: &str) -> &Self {
        write_file(&self.images().join(rel), b"not really an image");
        self
    }

    /// Create an (empty) folder under the image root.
    pub fn dir(&self, rel: &str) -> &Self {
        fs::create_dir_all(self.images().join(rel)).unwrap();
        self
    }

    /// Write a file with arbitrary content under the image root.
    pub fn file(&self, rel: &str, content: &str) -> &Self {
        write_file(&self.images().join(rel), content.as_bytes());
        self
    }

    /// Write `details.json` in the folder at `rel_dir`.
    pub fn details(&self, rel_dir: &str, json: &str) -> &Self {
        self.file(&format!("{rel_dir}/details.json"), json)
    }

    /// Create a placeholder thumbnail mirroring the image at `rel`.
    pub fn thumbnail(&self, rel: &str) -> &Self {
        write_file(&self.thumbnails().join(rel), b"thumb");
        self
    }

    pub fn dictionary_json(&self, json: &str) -> &Self {
        write_file(&self.dictionary(), json.as_bytes());
        self
    }

    /// Config pointing at this workspace.
    pub fn config(&self) -> ArchiveConfig {
        ArchiveConfig {
            images_dir: path_string(&self.images()),
            thumbnails_dir: path_string(&self.thumbnails()),
            static_dir: path_string(&self.tmp.path().join("static")),
            dictionary: path_string(&self.dictionary()),
            ..ArchiveConfig::default()
        }
    }

    pub fn options(&self) -> ScanOptions {
        ScanOptions {
            images_root: self.images(),
            thumbnails_root: self.thumbnails(),
            dictionary_path: self.dictionary(),
            levels: CATEGORY_LAYOUT,
            untagged_label: "ללא תיוג".to_string(),
            reserved: vec!["thumbnails".to_string(), "static".to_string()],
        }
    }

    pub fn scan(&self) -> Collection {
        scan(&self.options()).unwrap()
    }
}

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =========================================================================
// Entry lookups: panic with a clear message on miss
// =========================================================================

/// Find the entry for coin `name` (original) with the given subtype.
/// Panics if not found.
pub fn find_entry<'a>(
    entries: &'a [CollectionEntry],
    name: &str,
    subtype: Option<&str>,
) -> &'a CollectionEntry {
    entries
        .iter()
        .find(|e| {
            e.name.original == name
                && e.subtype.as_ref().map(|s| s.original.as_str()) == subtype
        })
        .unwrap_or_else(|| {
            let available: Vec<String> = entries.iter().map(describe).collect();
            panic!("entry '{name}' / {subtype:?} not found. Available: {available:?}")
        })
}

/// All entries for coin `name` (original), in scan order.
pub fn entries_for<'a>(entries: &'a [CollectionEntry], name: &str) -> Vec<&'a CollectionEntry> {
    entries.iter().filter(|e| e.name.original == name).collect()
}

/// Subtype originals of coin `name`, in scan order.
pub fn subtype_originals<'a>(entries: &'a [CollectionEntry], name: &str) -> Vec<Option<&'a str>> {
    entries_for(entries, name)
        .into_iter()
        .map(|e| e.subtype.as_ref().map(|s| s.original.as_str()))
        .collect()
}

fn describe(entry: &CollectionEntry) -> String {
    match &entry.subtype {
        Some(s) => format!("{}/{}", entry.name.original, s.original),
        None => entry.name.original.clone(),
    }
}
