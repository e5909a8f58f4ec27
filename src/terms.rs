//! Interactive translation of collection terms.
//!
//! Walks everything the gallery can display in Hebrew (interface strings,
//! folder names, `details.json` keys and values) and asks for an English
//! translation of each term the dictionary does not know yet.
//!
//! Answers are saved to the dictionary file immediately, so the session can
//! be interrupted at any point (Ctrl-D or Ctrl-C) and resumed later without
//! losing work. An empty answer stores the term as its own translation,
//! which marks it as "seen" and stops it being asked again.

use crate::dictionary::Dictionary;
use crate::scan::{ScanError, ScanOptions, scan_entries};
use crate::types::CollectionEntry;
use serde_json::Value;
use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum TermsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Hebrew strings hard-coded in the browser renderer.
pub const UI_TERMS: &[&str] = &[
    "ארכיון המטבעות הישראלי",
    "לפי שנה",
    "לפי סוג",
    "אודות ותודות",
    "הצהרת נגישות",
    "חפש שנה, שם או סדרה...",
    "אין נתונים נוספים",
    "ללא תיוג",
    "שנה",
    "סדרה",
];

/// A translatable string and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub context: String,
}

/// Outcome of a prompting session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PromptReport {
    /// Terms that were missing from the dictionary.
    pub missing: usize,
    /// Terms answered (and saved) this session.
    pub answered: usize,
}

impl PromptReport {
    /// Whether input ended before every missing term was answered.
    pub fn interrupted(&self) -> bool {
        self.answered < self.missing
    }
}

/// Collect every term from the interface and the collection, in display order.
///
/// Labels are read from their originals, so the scan's dictionary does not
/// matter.
pub fn collect_terms(entries: &[CollectionEntry], untagged_label: &str) -> Vec<Term> {
    let mut terms = TermList::default();
    for term in UI_TERMS {
        terms.push(term, "Website Interface");
    }
    terms.push(untagged_label, "Website Interface");

    for entry in entries {
        if let Some(category) = &entry.category {
            terms.push(&category.original, "Category Name");
        }
        terms.push(&entry.series.original, "Series Name");
        terms.push(&entry.name.original, "Coin Name");
        if let Some(subtype) = &entry.subtype {
            terms.push(&subtype.original, "Subtype");
        }

        let coin = &entry.name.original;
        for (key, value) in &entry.stats {
            terms.push(key, &format!("Key in {coin}"));
            match value {
                Value::String(s) => terms.push(s, &format!("Value in {coin}")),
                Value::Object(obj) => {
                    if let Some(Value::String(he)) = obj.get("he") {
                        terms.push(he, &format!("Value in {coin}"));
                    }
                }
                _ => {}
            }
        }
    }
    terms.into_vec()
}

/// Scan the collection and collect its terms.
pub fn gather_terms(options: &ScanOptions) -> Result<Vec<Term>, TermsError> {
    let entries = scan_entries(options, &Dictionary::new())?;
    Ok(collect_terms(&entries, &options.untagged_label))
}

/// Ask for a translation of every term missing from `dictionary`.
///
/// The dictionary is saved to `path` after each answer. End of input stops
/// the session early without error.
pub fn prompt_missing<R: BufRead, W: Write>(
    terms: &[Term],
    dictionary: &mut Dictionary,
    path: &Path,
    mut input: R,
    mut output: W,
) -> Result<PromptReport, TermsError> {
    let missing: Vec<&Term> = terms
        .iter()
        .filter(|t| !dictionary.contains(&t.text))
        .collect();
    let mut report = PromptReport {
        missing: missing.len(),
        answered: 0,
    };
    info!(total = terms.len(), missing = report.missing, "translation session");

    for term in missing {
        writeln!(output)?;
        writeln!(output, "------------------------------------------------")?;
        writeln!(output, "Context: {}", term.context)?;
        writeln!(output, "Source: [{}]", term.text)?;
        write!(output, "Translation: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }
        let answer = line.trim();
        let translated = if answer.is_empty() {
            term.text.as_str()
        } else {
            answer
        };

        dictionary.insert(term.text.clone(), translated);
        dictionary.save(path)?;
        report.answered += 1;
    }

    Ok(report)
}

/// Ordered, de-duplicated list of trimmed, non-empty terms.
#[derive(Default)]
struct TermList {
    seen: HashSet<String>,
    terms: Vec<Term>,
}

impl TermList {
    fn push(&mut self, text: &str, context: &str) {
        let text = text.trim();
        if text.is_empty() || !self.seen.insert(text.to_string()) {
            return;
        }
        self.terms.push(Term {
            text: text.to_string(),
            context: context.to_string(),
        });
    }

    fn into_vec(self) -> Vec<Term> {
        self.terms
    }
}
