//! Shared types served to the browser renderer.
//!
//! These are serialized as the body of `GET /api/data`; field names are part
//! of the contract with the frontend and must not be renamed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form coin attributes merged from `details.json` sidecars.
pub type Stats = Map<String, Value>;

/// A folder name paired with its translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub original: String,
    pub translated: String,
}

impl Label {
    pub fn new(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translated: translated.into(),
        }
    }
}

/// One coin (or one subtype of a coin) as shown in the gallery.
///
/// A coin folder expands into one entry for its loose images and one per
/// subtype folder; a folder with neither still produces a single empty entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Label>,
    pub series: Label,
    /// First image found directly in the series folder.
    pub series_img: Option<String>,
    /// Year folder name, verbatim.
    pub year: String,
    pub name: Label,
    pub subtype: Option<Label>,
    /// Image paths relative to the image root, `/`-separated, sorted by filename.
    pub images: Vec<String>,
    pub has_image: bool,
    /// URL path of the primary image's thumbnail, relative to the site root.
    pub thumb_src: Option<String>,
    pub thumb_available: bool,
    pub stats: Stats,
}

/// Response body of the data endpoint.
#[derive(Debug, Serialize)]
pub struct CollectionPayload<'a> {
    pub entries: &'a [CollectionEntry],
    /// `order.json` contents, passed through uninterpreted.
    pub config: &'a Value,
}
