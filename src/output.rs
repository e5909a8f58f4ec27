//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **information-centric, not file-centric**. Every collection
//! entity leads with its label (original, then translation when the
//! dictionary knows one); file details are indented context lines below it.
//! The scan output reads as an inventory of the collection, not a directory
//! listing.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Collection
//! 001 מחזור (Circulation)
//!     001 שקל חדש (New Shekel)
//!         1994
//!             001 שקל (Shekel) (2 images)
//!                 Thumbnail: ready
//!             002 שקל › חנוכה (Hanukkah) (0 images)
//!
//! Config
//!     order.json
//!     folder_map.json (12 terms)
//!
//! 2 entries, 2 images, 0 thumbnails missing
//! ```
//!
//! ## Thumbnails
//!
//! ```text
//! Thumbnails (3 images)
//!     מחזור/שקל חדש/1994/שקל/01.jpg → 400x300
//!     מחזור/שקל חדש/1994/שקל/02.jpg: cached
//!     מחזור/שקל חדש/1994/שקל/03.jpg: FAILED (decode error)
//!
//! Thumbnails: 1 created, 1 skipped, 1 failed
//!     Cache: 1 cached, 1 generated (2 total)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cache::CacheStatus;
use crate::details::PushReport;
use crate::scan::{Collection, ORDER_FILE};
use crate::terms::PromptReport;
use crate::thumbnails::{ThumbnailEvent, ThumbnailReport};
use crate::types::{CollectionEntry, Label};
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Original text, with the translation in parentheses when it differs.
fn label_text(label: &Label) -> String {
    if label.translated == label.original {
        label.original.clone()
    } else {
        format!("{} ({})", label.original, label.translated)
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Coin line: index, name, optional subtype, image count.
///
/// ```text
/// 001 שקל (Shekel) (2 images)
/// 002 שקל › חנוכה (0 images)
/// ```
fn entry_header(index: usize, entry: &CollectionEntry) -> String {
    let name = match &entry.subtype {
        Some(subtype) => format!("{} › {}", label_text(&entry.name), label_text(subtype)),
        None => label_text(&entry.name),
    };
    format!(
        "{} {} ({})",
        format_index(index),
        name,
        plural(entry.images.len(), "image", "images")
    )
}

// ============================================================================
// Scan output
// ============================================================================

/// Format the scanned collection as a category → series → year → coin tree.
///
/// Entries arrive in walk order, so a new group starts whenever its label
/// changes from the previous entry.
pub fn format_scan_output(collection: &Collection, images_root: &Path) -> Vec<String> {
    let mut lines = vec!["Collection".to_string()];

    let has_categories = collection.entries.iter().any(|e| e.category.is_some());
    let series_depth = usize::from(has_categories);

    let mut category: Option<&Label> = None;
    let mut series: Option<&Label> = None;
    let mut year: Option<&str> = None;
    let (mut category_pos, mut series_pos, mut coin_pos) = (0, 0, 0);

    for entry in &collection.entries {
        if has_categories && entry.category.as_ref() != category {
            category = entry.category.as_ref();
            category_pos += 1;
            series_pos = 0;
            series = None;
            year = None;
            let title = category.map(label_text).unwrap_or_default();
            lines.push(format!("{} {}", format_index(category_pos), title));
        }
        if Some(&entry.series) != series {
            series = Some(&entry.series);
            series_pos += 1;
            year = None;
            lines.push(format!(
                "{}{} {}",
                indent(series_depth),
                format_index(series_pos),
                label_text(&entry.series)
            ));
            if let Some(hero) = &entry.series_img {
                lines.push(format!("{}Hero: {}", indent(series_depth + 1), hero));
            }
        }
        if Some(entry.year.as_str()) != year {
            year = Some(&entry.year);
            coin_pos = 0;
            lines.push(format!("{}{}", indent(series_depth + 1), entry.year));
        }

        coin_pos += 1;
        let coin_depth = series_depth + 2;
        lines.push(format!("{}{}", indent(coin_depth), entry_header(coin_pos, entry)));
        if entry.has_image {
            let status = if entry.thumb_available { "ready" } else { "missing" };
            lines.push(format!("{}Thumbnail: {}", indent(coin_depth + 1), status));
        }
        if !entry.stats.is_empty() {
            let keys: Vec<&str> = entry.stats.keys().map(String::as_str).collect();
            lines.push(format!("{}Details: {}", indent(coin_depth + 1), keys.join(", ")));
        }
    }

    lines.push(String::new());
    lines.push("Config".to_string());
    if images_root.join(ORDER_FILE).is_file() {
        lines.push(format!("    {ORDER_FILE}"));
    }
    lines.push(format!(
        "    Dictionary ({})",
        plural(collection.dictionary.len(), "term", "terms")
    ));

    let images: usize = collection.entries.iter().map(|e| e.images.len()).sum();
    let missing = collection
        .entries
        .iter()
        .filter(|e| e.has_image && !e.thumb_available)
        .count();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}, {} missing",
        plural(collection.entries.len(), "entry", "entries"),
        plural(images, "image", "images"),
        plural(missing, "thumbnail", "thumbnails")
    ));

    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(collection: &Collection, images_root: &Path) {
    for line in format_scan_output(collection, images_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Thumbnail output
// ============================================================================

/// Format a single thumbnail progress event.
pub fn format_thumbnail_event(event: &ThumbnailEvent) -> Vec<String> {
    match event {
        ThumbnailEvent::Started { total } => {
            vec![format!("Thumbnails ({})", plural(*total, "image", "images"))]
        }
        ThumbnailEvent::Generated {
            rel_path,
            width,
            height,
        } => vec![format!("    {} \u{2192} {}x{}", rel_path, width, height)],
        ThumbnailEvent::Skipped { rel_path, status } => {
            let status = match status {
                CacheStatus::Hit => "cached",
                CacheStatus::Untracked => "adopted",
                CacheStatus::Miss => "skipped",
            };
            vec![format!("    {}: {}", rel_path, status)]
        }
        ThumbnailEvent::Failed { rel_path, error } => {
            vec![format!("    {}: FAILED ({})", rel_path, error)]
        }
    }
}

/// Format the end-of-run summary.
pub fn format_thumbnail_summary(report: &ThumbnailReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        format!(
            "Thumbnails: {} created, {} skipped, {} failed",
            report.created, report.skipped, report.failed
        ),
    ];
    if report.cache.total() > 0 {
        lines.push(format!("    Cache: {}", report.cache));
    }
    lines
}

pub fn print_thumbnail_summary(report: &ThumbnailReport) {
    for line in format_thumbnail_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Maintenance commands
// ============================================================================

/// Format the files touched by a details push.
pub fn format_push_report(report: &PushReport) -> Vec<String> {
    let verb = if report.dry_run { "Would update" } else { "Updated" };
    let mut lines: Vec<String> = report
        .updated
        .iter()
        .map(|path| format!("    {}", path))
        .collect();
    lines.push(format!(
        "{} {}",
        verb,
        plural(report.count(), "details file", "details files")
    ));
    lines
}

pub fn print_push_report(report: &PushReport) {
    for line in format_push_report(report) {
        println!("{}", line);
    }
}

/// Format the folders that received a `.gitkeep`, relative to `root`.
pub fn format_secured(secured: &[PathBuf], root: &Path) -> Vec<String> {
    let mut lines: Vec<String> = secured
        .iter()
        .map(|dir| {
            let rel = dir.strip_prefix(root).unwrap_or(dir);
            if rel.as_os_str().is_empty() {
                "    ./".to_string()
            } else {
                format!("    {}/", rel.display())
            }
        })
        .collect();
    lines.push(format!(
        "Secured {}",
        plural(secured.len(), "folder", "folders")
    ));
    lines
}

pub fn print_secured(secured: &[PathBuf], root: &Path) {
    for line in format_secured(secured, root) {
        println!("{}", line);
    }
}

/// Format the end of a translation session.
pub fn format_prompt_report(report: &PromptReport) -> Vec<String> {
    if report.missing == 0 {
        return vec!["Dictionary is complete".to_string()];
    }
    let mut lines = vec![format!(
        "Translated {} of {}",
        report.answered,
        plural(report.missing, "missing term", "missing terms")
    )];
    if report.interrupted() {
        lines.push("Run again to continue where you left off".to_string());
    }
    lines
}

pub fn print_prompt_report(report: &PromptReport) {
    for line in format_prompt_report(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::test_helpers::Workspace;

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn label_text_hides_identity_translation() {
        assert_eq!(label_text(&Label::new("1994", "1994")), "1994");
        assert_eq!(label_text(&Label::new("שקל", "Shekel")), "שקל (Shekel)");
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "image", "images"), "1 image");
        assert_eq!(plural(0, "image", "images"), "0 images");
    }

    // =========================================================================
    // Scan
    // =========================================================================

    #[test]
    fn scan_output_groups_entries() {
        let ws = Workspace::new();
        ws.image("מחזור/שקל חדש/1994/שקל/01.jpg")
            .image("מחזור/שקל חדש/1994/שקל/02.jpg")
            .thumbnail("מחזור/שקל חדש/1994/שקל/01.jpg")
            .image("מחזור/שקל חדש/1995/אגורה/01.jpg")
            .dictionary_json(r#"{"שקל": "Shekel"}"#);

        let lines = format_scan_output(&ws.scan(), &ws.images());

        assert_eq!(lines[0], "Collection");
        assert_eq!(lines[1], "001 מחזור");
        assert_eq!(lines[2], "    001 שקל חדש");
        assert_eq!(lines[3], "        1994");
        assert_eq!(lines[4], "            001 שקל (Shekel) (2 images)");
        assert_eq!(lines[5], "                Thumbnail: ready");
        assert_eq!(lines[6], "        1995");
        assert_eq!(lines[7], "            001 אגורה (1 image)");
        assert_eq!(lines[8], "                Thumbnail: missing");
        assert!(lines.contains(&"    Dictionary (1 term)".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "2 entries, 3 images, 1 thumbnail missing"
        );
    }

    #[test]
    fn scan_output_shows_subtypes_and_details() {
        let ws = Workspace::new();
        ws.image("C/S/1990/Coin/01.jpg")
            .dir("C/S/1990/Coin/Proof")
            .details("C/S/1990/Coin", r#"{"weight": "5g", "metal": "gold"}"#)
            .file("order.json", "{}");

        let lines = format_scan_output(&ws.scan(), &ws.images());

        assert!(lines.contains(&"            001 Coin › ללא תיוג (1 image)".to_string()));
        assert!(lines.contains(&"            002 Coin › Proof (0 images)".to_string()));
        assert!(lines.contains(&"                Details: weight, metal".to_string()));
        assert!(lines.contains(&"    order.json".to_string()));
    }

    #[test]
    fn scan_output_empty_collection() {
        let ws = Workspace::new();
        let lines = format_scan_output(&ws.scan(), &ws.images());
        assert_eq!(lines[0], "Collection");
        assert_eq!(lines[1], "");
        assert_eq!(lines.last().unwrap(), "0 entries, 0 images, 0 thumbnails missing");
    }

    // =========================================================================
    // Thumbnails
    // =========================================================================

    #[test]
    fn thumbnail_events() {
        assert_eq!(
            format_thumbnail_event(&ThumbnailEvent::Started { total: 3 }),
            vec!["Thumbnails (3 images)"]
        );
        assert_eq!(
            format_thumbnail_event(&ThumbnailEvent::Generated {
                rel_path: "a/b.jpg".into(),
                width: 400,
                height: 300,
            }),
            vec!["    a/b.jpg \u{2192} 400x300"]
        );
        assert_eq!(
            format_thumbnail_event(&ThumbnailEvent::Skipped {
                rel_path: "a/c.jpg".into(),
                status: CacheStatus::Untracked,
            }),
            vec!["    a/c.jpg: adopted"]
        );
        assert_eq!(
            format_thumbnail_event(&ThumbnailEvent::Failed {
                rel_path: "a/d.jpg".into(),
                error: "bad".into(),
            }),
            vec!["    a/d.jpg: FAILED (bad)"]
        );
    }

    #[test]
    fn thumbnail_summary_includes_cache_line() {
        let mut cache = CacheStats::default();
        cache.record(CacheStatus::Hit);
        cache.record(CacheStatus::Miss);
        let report = ThumbnailReport {
            created: 1,
            skipped: 1,
            failed: 0,
            cache,
        };

        let lines = format_thumbnail_summary(&report);
        assert_eq!(lines[1], "Thumbnails: 1 created, 1 skipped, 0 failed");
        assert_eq!(lines[2], "    Cache: 1 cached, 1 generated (2 total)");
    }

    #[test]
    fn thumbnail_summary_without_work() {
        let lines = format_thumbnail_summary(&ThumbnailReport::default());
        assert_eq!(lines.len(), 2);
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    #[test]
    fn push_report_lists_files() {
        let report = PushReport {
            updated: vec!["g/1990/c/details.json".into()],
            dry_run: true,
        };
        assert_eq!(
            format_push_report(&report),
            vec!["    g/1990/c/details.json", "Would update 1 details file"]
        );
    }

    #[test]
    fn secured_paths_are_relative() {
        let root = Path::new("/srv/images");
        let secured = vec![root.to_path_buf(), root.join("C/S")];
        assert_eq!(
            format_secured(&secured, root),
            vec!["    ./", "    C/S/", "Secured 2 folders"]
        );
    }

    #[test]
    fn prompt_report_messages() {
        assert_eq!(
            format_prompt_report(&PromptReport::default()),
            vec!["Dictionary is complete"]
        );
        let interrupted = PromptReport {
            missing: 3,
            answered: 1,
        };
        let lines = format_prompt_report(&interrupted);
        assert_eq!(lines[0], "Translated 1 of 3 missing terms");
        assert_eq!(lines.len(), 2);
    }
}
