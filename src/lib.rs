//! # Coin Archive
//!
//! A small web gallery for a coin collection kept as plain folders. The
//! filesystem is the data source: folders are categories, series, years,
//! coins and subtypes; `details.json` sidecars carry the free-form
//! attributes; a flat dictionary file translates Hebrew folder names to
//! English.
//!
//! ```text
//! images/
//! ├── order.json                     # Display order, passed to the browser as-is
//! ├── about.json                     # About page content
//! └── מחזור/                          # Category
//!     └── שקל חדש/                    # Series (first image here = series hero)
//!         └── 1994/                   # Year, verbatim
//!             └── שקל/                # Coin
//!                 ├── details.json    # Coin-level attributes
//!                 ├── 01.jpg          # Loose images
//!                 └── חנוכה/          # Subtype
//!                     ├── details.json
//!                     └── 01.jpg
//! thumbnails/                         # Mirror of images/, generated
//! folder_map.json                     # Hebrew → English dictionary
//! ```
//!
//! # Architecture
//!
//! There is no index and no database. Every `GET /api/data` re-walks the
//! tree and returns the merged entries, so editing files on disk is the
//! whole admin interface. The batch commands (thumbnails, details push,
//! translation, folder securing) are independent helpers over the same tree.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Walks the tree and builds [`types::CollectionEntry`] values |
//! | [`types`] | Entry and payload types served to the browser |
//! | [`metadata`] | Fail-open JSON sidecar loading, overlay and pretty writing |
//! | [`dictionary`] | Original → translated lookups with identity fallback |
//! | [`server`] | Thread-per-connection HTTP server and routes |
//! | [`pages`] | Index shell and about page, rendered with Maud |
//! | [`thumbnails`] | Parallel thumbnail generation into the mirrored tree |
//! | [`imaging`] | Pure-Rust decode, resize and encode behind a backend trait |
//! | [`cache`] | Thumbnail cache manifest for skipping unchanged images |
//! | [`details`] | Bulk `details.json` updates from a rules file |
//! | [`terms`] | Interactive prompt for missing dictionary terms |
//! | [`folders`] | `.gitkeep` markers for empty collection folders |
//! | [`config`] | `coins.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fail-Open Sidecars
//!
//! Every operator-edited JSON file (`details.json`, `order.json`,
//! `about.json`, the dictionary) loads as empty when missing or malformed.
//! A typo in one coin's sidecar hides that coin's attributes, not the
//! whole gallery. Filesystem errors at the image root are the exception:
//! they fail the request instead of serving a partial collection.
//!
//! ## Thumbnails by Mirroring
//!
//! A thumbnail lives at the same relative path under `thumbnails/` as its
//! source under `images/`. Availability is a single `is_file` check during
//! the scan, with no manifest to consult or keep in sync.

pub mod cache;
pub mod config;
pub mod details;
pub mod dictionary;
pub mod folders;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod pages;
pub mod scan;
pub mod server;
pub mod terms;
pub mod thumbnails;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
