//! Keep empty collection folders under version control.
//!
//! Git does not track empty directories, yet an empty coin folder is
//! meaningful: it lists a coin the archive knows about but has no photo of.
//! Every directory without a visible file gets an empty `.gitkeep`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Marker file name.
pub const GITKEEP: &str = ".gitkeep";

/// Add `.gitkeep` to every directory under `root` (inclusive) that has no
/// visible files. Returns the directories that were secured.
///
/// Subdirectories don't count as content: a folder holding only folders is
/// still empty to git once those are empty too, so it is marked as well.
pub fn secure_empty_folders(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut secured = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path();
        if has_visible_file(dir)? {
            continue;
        }
        let marker = dir.join(GITKEEP);
        if marker.exists() {
            continue;
        }
        fs::File::create(&marker)?;
        info!(dir = %dir.display(), "secured folder");
        secured.push(dir.to_path_buf());
    }

    Ok(secured)
}

fn has_visible_file(dir: &Path) -> std::io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}
