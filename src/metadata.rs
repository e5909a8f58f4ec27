//! Sidecar metadata loading and merging.
//!
//! Coin attributes (weight, diameter, alloy, ...) live in `details.json`
//! files next to the images, at two levels:
//!
//! ```text
//! images/שקל חדש/1994/שקל/details.json          # coin level
//! images/שקל חדש/1994/שקל/חנוכה/details.json    # subtype level
//! ```
//!
//! ## Fail-open reads
//!
//! These files are edited by hand and are low-trust input. A missing file, an
//! unreadable file, invalid JSON, or a document that is not an object all
//! load as `{}`. The scan never aborts because of a sidecar; the parse error
//! is logged at debug level so it can still be tracked down.
//!
//! ## Resolution
//!
//! Subtype stats are a shallow overlay of the subtype object on top of the
//! coin object: subtype keys replace coin keys of the same name wholesale,
//! nested objects are not merged.

use crate::types::Stats;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Sidecar file name at coin and subtype level.
pub const DETAILS_FILE: &str = "details.json";

/// Read any JSON document, or `{}` if it is missing or malformed.
pub fn get_json_data(path: &Path) -> Value {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Value::Object(Stats::new()),
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "treating malformed JSON as empty");
            Value::Object(Stats::new())
        }
    }
}

/// Read a JSON object, or an empty map for anything else.
pub fn read_json_object(path: &Path) -> Stats {
    match get_json_data(path) {
        Value::Object(map) => map,
        other => {
            debug!(path = %path.display(), kind = json_kind(&other), "expected a JSON object");
            Stats::new()
        }
    }
}

/// Read the `details.json` sidecar of a coin or subtype folder.
pub fn read_details(dir: &Path) -> Stats {
    read_json_object(&dir.join(DETAILS_FILE))
}

/// Shallow overlay: keys from `overlay` replace keys in `base`.
pub fn overlay_stats(base: &Stats, overlay: &Stats) -> Stats {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Write pretty JSON (4-space indent, raw UTF-8) followed by a newline.
///
/// Used for every file this crate writes back for humans to edit.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(std::io::Error::from)?;
    buf.push(b'\n');
    std::fs::write(path, buf)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
