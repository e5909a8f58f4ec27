//! Collection scanning.
//!
//! Walks the image root and turns the folder hierarchy into the flat list of
//! [`CollectionEntry`] values the gallery renders. The directory tree and its
//! `details.json` sidecars are the only source of truth; nothing is cached
//! and every data request runs a fresh scan.
//!
//! ## Directory Structure
//!
//! ```text
//! images/                              # Collection root
//! ├── order.json                       # Display ordering (opaque, passed through)
//! ├── about.json                       # About page content
//! ├── מטבעות מחזור/                    # Category
//! │   └── שקל חדש/                     # Series
//! │       ├── hero.jpg                 # Series image (first image found)
//! │       └── 1994/                    # Year (name used verbatim)
//! │           ├── שקל/                 # Coin
//! │           │   ├── details.json     # Coin stats
//! │           │   ├── a-obverse.jpg    # Loose images → "untagged" entry
//! │           │   └── חנוכה/           # Subtype
//! │           │       ├── details.json # Subtype stats (overlay coin stats)
//! │           │       └── 01.jpg
//! │           └── 10 אגורות/           # Coin without photos → empty entry
//! └── thumbnails/                      # Reserved, never a category
//! ```
//!
//! The category level is optional ([`ScanConfig::categories`]); without it
//! series folders sit directly under the root.
//!
//! ## Coin Classification
//!
//! Each coin folder's immediate children are split into images (by
//! extension) and subdirectories (subtypes):
//!
//! - **Loose images**: one entry. Its subtype is the untagged label when
//!   subtype folders also exist, otherwise `null`.
//! - **Subtype folders**: one entry each, photographed or not, with stats
//!   overlaid on the coin's.
//! - **Neither**: a single empty entry, so known but unphotographed coins
//!   still show up.
//!
//! ## Ordering
//!
//! Folders are visited in name order and images are sorted by filename, so
//! two scans of an unchanged tree produce identical entries. The one
//! exception is the series image, which is the first image in directory
//! listing order.
//!
//! ## Failures
//!
//! An unreadable image root fails the scan. Anything below the root that
//! cannot be listed is logged and skipped; an unreadable coin or subtype
//! folder still yields its (empty) entry.
//!
//! [`ScanConfig::categories`]: crate::config::ScanConfig::categories

use crate::config::ArchiveConfig;
use crate::dictionary::Dictionary;
use crate::metadata::{get_json_data, overlay_stats, read_details};
use crate::types::{CollectionEntry, CollectionPayload, Label, Stats};
use serde_json::Value;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read collection root {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Collection root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Extensions (lowercase) recognised as collection images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Display-order config at the collection root.
pub const ORDER_FILE: &str = "order.json";

/// URL prefix thumbnails are served under.
pub const THUMBNAILS_ROUTE: &str = "thumbnails";

/// One level of the folder hierarchy above the subtype folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Category,
    Series,
    Year,
    Coin,
}

/// `images/<category>/<series>/<year>/<coin>`
pub const CATEGORY_LAYOUT: &[Level] = &[Level::Category, Level::Series, Level::Year, Level::Coin];

/// `images/<series>/<year>/<coin>`
pub const SERIES_LAYOUT: &[Level] = &[Level::Series, Level::Year, Level::Coin];

/// Everything a scan needs to know about where things live.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub images_root: PathBuf,
    pub thumbnails_root: PathBuf,
    pub dictionary_path: PathBuf,
    pub levels: &'static [Level],
    pub untagged_label: String,
    /// Root-level names never treated as collection groups.
    pub reserved: Vec<String>,
}

impl ScanOptions {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            images_root: config.images_root(),
            thumbnails_root: config.thumbnails_root(),
            dictionary_path: config.dictionary_path(),
            levels: if config.scan.categories {
                CATEGORY_LAYOUT
            } else {
                SERIES_LAYOUT
            },
            untagged_label: config.scan.untagged_label.clone(),
            reserved: config.scan.reserved.clone(),
        }
    }
}

/// Result of a scan: the entries plus the two side-channel files.
#[derive(Debug)]
pub struct Collection {
    pub entries: Vec<CollectionEntry>,
    /// `order.json` contents, `{}` when absent or malformed.
    pub config: Value,
    pub dictionary: Dictionary,
}

impl Collection {
    /// Body of the data endpoint: `{ entries, config }`.
    pub fn payload(&self) -> CollectionPayload<'_> {
        CollectionPayload {
            entries: &self.entries,
            config: &self.config,
        }
    }
}

/// Scan the collection, loading the dictionary and order config alongside.
///
/// Creates the image root if it does not exist yet.
pub fn scan(options: &ScanOptions) -> Result<Collection, ScanError> {
    let dictionary = Dictionary::load(&options.dictionary_path);
    let entries = scan_entries(options, &dictionary)?;
    let config = get_json_data(&options.images_root.join(ORDER_FILE));
    Ok(Collection {
        entries,
        config,
        dictionary,
    })
}

/// Walk the tree and build entries with labels from `dictionary`.
pub fn scan_entries(
    options: &ScanOptions,
    dictionary: &Dictionary,
) -> Result<Vec<CollectionEntry>, ScanError> {
    let root = &options.images_root;
    if !root.exists() {
        fs::create_dir_all(root).map_err(|source| ScanError::Root {
            path: root.clone(),
            source,
        })?;
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.clone()));
    }

    let mut listing = list_dir(root).map_err(|source| ScanError::Root {
        path: root.clone(),
        source,
    })?;
    listing
        .dirs
        .retain(|name| !options.reserved.iter().any(|r| r == name));

    let walker = Walker {
        options,
        dictionary,
    };
    let mut entries = Vec::new();
    walker.descend(root, listing, options.levels, &Trail::default(), &mut entries);
    Ok(entries)
}

/// Whether a filename has one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Immediate children of a directory, split by kind.
#[derive(Debug, Default)]
struct Listing {
    /// Subdirectory names, sorted.
    dirs: Vec<String>,
    /// Image filenames in directory listing order.
    images: Vec<String>,
}

/// List a directory, skipping hidden entries and names that are not UTF-8.
fn list_dir(dir: &Path) -> std::io::Result<Listing> {
    let children = fs::read_dir(dir)?.map(|entry| {
        entry.map(|e| {
            let is_dir = e.path().is_dir();
            (e.file_name(), is_dir)
        })
    });
    Ok(classify(dir, children))
}

/// Split `(name, is_dir)` children into a [`Listing`]. Entries that fail to
/// read are logged and skipped so their siblings still show up.
fn classify(
    dir: &Path,
    children: impl IntoIterator<Item = std::io::Result<(OsString, bool)>>,
) -> Listing {
    let mut listing = Listing::default();
    for child in children {
        let (raw, is_dir) = match child {
            Ok(c) => c,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        let name = match raw.into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(dir = %dir.display(), name = ?raw, "skipping non UTF-8 name");
                continue;
            }
        };
        if name.starts_with('.') {
            continue;
        }
        if is_dir {
            listing.dirs.push(name);
        } else if is_image_name(&name) {
            listing.images.push(name);
        }
    }
    listing.dirs.sort();
    listing
}

/// Labels and path segments accumulated on the way down.
#[derive(Debug, Clone, Default)]
struct Trail {
    segments: Vec<String>,
    category: Option<Label>,
    series: Label,
    series_img: Option<String>,
    year: String,
}

impl Trail {
    fn child(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(name.to_string());
        next
    }

    /// `/`-joined relative path of a file below this trail.
    fn rel_path(&self, tail: &[&str]) -> String {
        self.segments
            .iter()
            .map(String::as_str)
            .chain(tail.iter().copied())
            .collect::<Vec<_>>()
            .join("/")
    }
}

struct Walker<'a> {
    options: &'a ScanOptions,
    dictionary: &'a Dictionary,
}

impl Walker<'_> {
    fn descend(
        &self,
        dir: &Path,
        listing: Listing,
        levels: &[Level],
        trail: &Trail,
        entries: &mut Vec<CollectionEntry>,
    ) {
        let Some((&level, rest)) = levels.split_first() else {
            return;
        };

        for name in listing.dirs {
            let path = dir.join(&name);
            let mut next = trail.child(&name);

            if level == Level::Coin {
                self.scan_coin(&path, &next, entries);
                continue;
            }

            let child_listing = match list_dir(&path) {
                Ok(l) => l,
                Err(e) => {
                    warn!(dir = %path.display(), error = %e, "skipping unreadable folder");
                    continue;
                }
            };

            match level {
                Level::Category => next.category = Some(self.dictionary.label(&name)),
                Level::Series => {
                    next.series = self.dictionary.label(&name);
                    next.series_img = child_listing
                        .images
                        .first()
                        .map(|img| next.rel_path(&[img]));
                }
                Level::Year => next.year = name,
                Level::Coin => unreachable!("coin folders are handled above"),
            }

            self.descend(&path, child_listing, rest, &next, entries);
        }
    }

    fn scan_coin(&self, coin_dir: &Path, trail: &Trail, entries: &mut Vec<CollectionEntry>) {
        let coin_stats = read_details(coin_dir);
        let listing = match list_dir(coin_dir) {
            Ok(l) => l,
            Err(e) => {
                warn!(dir = %coin_dir.display(), error = %e, "cannot list coin folder");
                entries.push(self.entry(trail, None, Vec::new(), coin_stats));
                return;
            }
        };

        let mut loose = listing.images;
        loose.sort();
        let has_subtypes = !listing.dirs.is_empty();

        if !loose.is_empty() {
            let subtype = has_subtypes.then(|| self.dictionary.label(&self.options.untagged_label));
            let images = loose.iter().map(|img| trail.rel_path(&[img])).collect();
            entries.push(self.entry(trail, subtype, images, coin_stats.clone()));
        }

        for subtype in &listing.dirs {
            let subtype_dir = coin_dir.join(subtype);
            let mut names = match list_dir(&subtype_dir) {
                Ok(l) => l.images,
                Err(e) => {
                    warn!(dir = %subtype_dir.display(), error = %e, "cannot list subtype folder");
                    Vec::new()
                }
            };
            names.sort();
            let images = names
                .iter()
                .map(|img| trail.rel_path(&[subtype, img]))
                .collect();
            let stats = overlay_stats(&coin_stats, &read_details(&subtype_dir));
            let label = self.dictionary.label(subtype);
            entries.push(self.entry(trail, Some(label), images, stats));
        }

        if loose.is_empty() && !has_subtypes {
            debug!(dir = %coin_dir.display(), "coin folder has no photos");
            entries.push(self.entry(trail, None, Vec::new(), coin_stats));
        }
    }

    fn entry(
        &self,
        trail: &Trail,
        subtype: Option<Label>,
        images: Vec<String>,
        stats: Stats,
    ) -> CollectionEntry {
        let primary = images.first();
        let thumb_src = primary.map(|p| format!("{THUMBNAILS_ROUTE}/{p}"));
        let thumb_available =
            primary.is_some_and(|p| self.options.thumbnails_root.join(p).is_file());
        let name = trail.segments.last().map(String::as_str).unwrap_or_default();

        CollectionEntry {
            category: trail.category.clone(),
            series: trail.series.clone(),
            series_img: trail.series_img.clone(),
            year: trail.year.clone(),
            name: self.dictionary.label(name),
            subtype,
            has_image: !images.is_empty(),
            images,
            thumb_src,
            thumb_available,
            stats,
        }
    }
}
