//! Server-rendered HTML pages.
//!
//! The gallery itself is rendered in the browser from `/api/data`; the
//! server only provides two small pages:
//!
//! - **Index** (`/`): a shell that loads the renderer from `/static/`.
//! - **About** (`/about`): built from `about.json` at the image root.
//!
//! ## about.json
//!
//! A free-form JSON object edited by hand. `title` becomes the page heading;
//! every other key becomes a section:
//!
//! ```json
//! {
//!     "title": "אודות ותודות",
//!     "אודות": "Markdown **text**",
//!     "תודות": ["Markdown list item", "Another one"],
//!     "קישורים": { "אתר": "[link](https://example.org)" }
//! }
//! ```
//!
//! Strings are rendered as markdown, arrays as lists, nested objects as
//! subsections. A missing or malformed file renders the heading only.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating.
//! Templates are type-safe Rust code with automatic XSS escaping.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use serde_json::Value;

/// Site title, also the first interface term.
pub const SITE_TITLE: &str = "ארכיון המטבעות הישראלי";

/// Heading used when `about.json` has no `title`.
pub const ABOUT_TITLE: &str = "אודות ותודות";

/// About page content at the image root.
pub const ABOUT_FILE: &str = "about.json";

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(title: &str, body_class: Option<&str>, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="he" dir="rtl" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href="/static/style.css";
            }
            body class=[body_class] {
                (content)
            }
        }
    }
}

/// Renders the site header linking back to the gallery
fn site_header(current: Option<&str>) -> Markup {
    html! {
        header.site-header {
            nav.breadcrumb {
                a href="/" { (SITE_TITLE) }
                @if let Some(current) = current {
                    " › "
                    (current)
                }
            }
        }
    }
}

/// Convert markdown to HTML.
fn markdown(text: &str) -> Markup {
    let parser = Parser::new(text);
    let mut body_html = String::new();
    md_html::push_html(&mut body_html, parser);
    PreEscaped(body_html)
}

// ============================================================================
// Page Renderers
// ============================================================================

/// Renders the index shell; the browser renderer fills `#app`.
pub fn render_index() -> Markup {
    let content = html! {
        (site_header(None))
        main #app data-api="/api/data" data-translations="/api/translations" {
            noscript { "יש להפעיל JavaScript כדי לצפות בארכיון." }
        }
        script src="/static/app.js" defer {}
    };

    base_document(SITE_TITLE, Some("index-page"), content)
}

/// Renders the about page from the contents of `about.json`.
pub fn render_about(about: &Value) -> Markup {
    let title = about
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(ABOUT_TITLE);

    let content = html! {
        (site_header(Some(title)))
        main.about-page {
            article.about-content {
                h1 { (title) }
                @match about {
                    Value::Object(map) => {
                        @for (key, value) in map.iter().filter(|(k, _)| k.as_str() != "title") {
                            (render_section(key, value, 2))
                        }
                    }
                    Value::Null => {}
                    other => (render_value(other, 2)),
                }
            }
        }
    };

    base_document(title, Some("about"), content)
}

fn render_section(heading: &str, value: &Value, level: u8) -> Markup {
    html! {
        section {
            @match level {
                2 => h2 { (heading) },
                3 => h3 { (heading) },
                _ => h4 { (heading) },
            }
            (render_value(value, level + 1))
        }
    }
}

fn render_value(value: &Value, level: u8) -> Markup {
    html! {
        @match value {
            Value::String(s) => (markdown(s)),
            Value::Array(items) => {
                ul {
                    @for item in items {
                        li { (render_value(item, level)) }
                    }
                }
            }
            Value::Object(map) => {
                @for (key, inner) in map {
                    (render_section(key, inner, level))
                }
            }
            Value::Null => {}
            other => p { (other.to_string()) },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
