//! Bulk `details.json` updates.
//!
//! Coins of the same denomination share their physical attributes across
//! many years, so typing the same weight and alloy into dozens of sidecars is
//! error prone. A rules file describes the shared data once:
//!
//! ```toml
//! [[rule]]
//! group = "לירה"                  # folder under the image root
//! years = [1960, 1981]            # year folders 1960..=1980 (end exclusive)
//! coin = "אגורה"                  # coin folder inside each year
//! data = { "משקל" = "1.3 גרם", "קוטר" = "21 מ\"מ" }
//!
//! [[rule]]
//! group = "מחזור/שקל חדש"
//! match = ["1994", "1995"]        # substrings of the year folder name
//! coin = "שקל"
//! data = { "חומר" = "פלדה מצופה ניקל" }
//! ```
//!
//! For every folder directly inside `group` whose name contains one of the
//! needles (the `match` strings plus every year in `years`) and that holds a
//! `coin` folder, the coin's `details.json` is loaded (missing, invalid or
//! non-object → `{}`), `data` is overlaid key by key, and the result is
//! written back with 4-space indentation.
//!
//! All groups are checked before anything is written, so a typo in one rule
//! does not leave the collection half updated.

use crate::metadata::{DETAILS_FILE, overlay_stats, write_json_pretty};
use crate::types::Stats;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DetailsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Group folder not found: {0}")]
    GroupNotFound(PathBuf),
    #[error("Invalid rule: {0}")]
    Invalid(String),
}

/// A parsed rules file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesFile {
    #[serde(default, rename = "rule")]
    pub rules: Vec<PushRule>,
}

/// One bulk update: which coin folders to touch and what to write.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushRule {
    /// Folder under the image root whose children are matched.
    pub group: String,
    /// Substrings; a child matches if its name contains any of them.
    #[serde(default, rename = "match")]
    pub matches: Vec<String>,
    /// Half-open `[from, to)` range of years added to the substrings.
    #[serde(default)]
    pub years: Option<[i32; 2]>,
    /// Coin folder name inside each matched child.
    pub coin: String,
    /// Keys to set in each `details.json`.
    pub data: Stats,
}

impl PushRule {
    /// All substrings this rule matches on.
    pub fn needles(&self) -> Vec<String> {
        let mut needles = self.matches.clone();
        if let Some([from, to]) = self.years {
            needles.extend((from..to).map(|y| y.to_string()));
        }
        needles
    }

    fn validate(&self) -> Result<(), DetailsError> {
        if self.matches.is_empty() && self.years.is_none() {
            return Err(DetailsError::Invalid(format!(
                "rule for '{}/{}' needs `match` or `years`",
                self.group, self.coin
            )));
        }
        if let Some([from, to]) = self.years
            && from >= to
        {
            return Err(DetailsError::Invalid(format!(
                "years [{from}, {to}) is empty"
            )));
        }
        if self.coin.trim().is_empty() {
            return Err(DetailsError::Invalid(format!(
                "rule for '{}' has an empty coin name",
                self.group
            )));
        }
        Ok(())
    }
}

/// Result of a push run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    /// `details.json` files written (or that would be, on a dry run),
    /// relative to the image root.
    pub updated: Vec<String>,
    pub dry_run: bool,
}

impl PushReport {
    pub fn count(&self) -> usize {
        self.updated.len()
    }
}

/// Parse a rules file.
pub fn load_rules(path: &Path) -> Result<RulesFile, DetailsError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply every rule in order. Later rules win on key collisions.
pub fn push_details(
    images_root: &Path,
    rules: &[PushRule],
    dry_run: bool,
) -> Result<PushReport, DetailsError> {
    for rule in rules {
        rule.validate()?;
        let group_dir = images_root.join(&rule.group);
        if !group_dir.is_dir() {
            return Err(DetailsError::GroupNotFound(group_dir));
        }
    }

    let mut report = PushReport {
        dry_run,
        ..PushReport::default()
    };
    for rule in rules {
        let count_before = report.count();
        apply_rule(images_root, rule, dry_run, &mut report)?;
        info!(
            group = %rule.group,
            coin = %rule.coin,
            files = report.count() - count_before,
            dry_run,
            "applied details rule"
        );
    }
    Ok(report)
}

fn apply_rule(
    images_root: &Path,
    rule: &PushRule,
    dry_run: bool,
    report: &mut PushReport,
) -> Result<(), DetailsError> {
    let needles = rule.needles();
    let group_dir = images_root.join(&rule.group);

    let mut children: Vec<String> = fs::read_dir(&group_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    children.sort();

    for child in children {
        if !needles.iter().any(|n| child.contains(n.as_str())) {
            continue;
        }
        let coin_dir = group_dir.join(&child).join(&rule.coin);
        if !coin_dir.is_dir() {
            debug!(dir = %coin_dir.display(), "no coin folder, skipping");
            continue;
        }

        if !dry_run {
            let path = coin_dir.join(DETAILS_FILE);
            let merged = overlay_stats(&existing_details(&path)?, &rule.data);
            write_json_pretty(&path, &merged)?;
        }
        report
            .updated
            .push(format!("{}/{}/{}/{}", rule.group, child, rule.coin, DETAILS_FILE));
    }
    Ok(())
}

/// Current contents of a `details.json` about to be rewritten.
///
/// A file that cannot be read is an error, so it is never overwritten. Content
/// that is not a JSON object is replaced.
fn existing_details(path: &Path) -> Result<Stats, DetailsError> {
    if !path.exists() {
        return Ok(Stats::new());
    }
    let raw = fs::read_to_string(path)?;
    match serde_json::from_str(&raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        _ => {
            debug!(path = %path.display(), "existing details are not a JSON object, replacing");
            Ok(Stats::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::Workspace;
    use serde_json::{Value, json};

    fn rules(toml_src: &str) -> Vec<PushRule> {
        toml::from_str::<RulesFile>(toml_src).unwrap().rules
    }

    fn read(ws: &Workspace, rel: &str) -> Value {
        let raw = fs::read_to_string(ws.images().join(rel)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn parses_rules_file() {
        let parsed = rules(
            r#"
[[rule]]
group = "לירה"
years = [1960, 1963]
coin = "אגורה"
data = { "משקל" = "1.3 גרם" }

[[rule]]
group = "שקל"
match = ["198"]
coin = "שקל"
data = { "קוטר" = "23 מ\"מ", "mintage" = 1000 }
"#,
        );
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].needles(), vec!["1960", "1961", "1962"]);
        assert_eq!(parsed[1].data["mintage"], json!(1000));
    }

    #[test]
    fn unknown_rule_key_rejected() {
        let result = toml::from_str::<RulesFile>(
            "[[rule]]\ngroup = \"a\"\ncoin = \"b\"\ndata = {}\nyear = [1, 2]\n",
        );
        assert!(result.is_err());
    }

    #[test]
    fn years_are_half_open_and_combine_with_match() {
        let parsed = rules(
            "[[rule]]\ngroup = \"g\"\nmatch = [\"x\"]\nyears = [2000, 2002]\ncoin = \"c\"\ndata = {}\n",
        );
        assert_eq!(parsed[0].needles(), vec!["x", "2000", "2001"]);
    }

    #[test]
    fn pushes_into_matching_coin_folders() {
        let ws = Workspace::new();
        ws.dir("לירה/1960/אגורה")
            .dir("לירה/1961/אגורה")
            .dir("לירה/1962/לירה")
            .dir("לירה/1990/אגורה");

        let parsed = rules(
            "[[rule]]\ngroup = \"לירה\"\nyears = [1960, 1981]\ncoin = \"אגורה\"\ndata = { \"משקל\" = \"1.3 גרם\" }\n",
        );
        let report = push_details(&ws.images(), &parsed, false).unwrap();

        assert_eq!(
            report.updated,
            vec![
                "לירה/1960/אגורה/details.json",
                "לירה/1961/אגורה/details.json",
            ]
        );
        assert_eq!(
            read(&ws, "לירה/1960/אגורה/details.json"),
            json!({"משקל": "1.3 גרם"})
        );
        assert!(!ws.images().join("לירה/1962/לירה/details.json").exists());
        assert!(!ws.images().join("לירה/1990/אגורה/details.json").exists());
    }

    #[test]
    fn match_is_substring_of_folder_name() {
        let ws = Workspace::new();
        ws.dir("g/1985 (proof)/c").dir("g/1986/c");

        let parsed = rules("[[rule]]\ngroup = \"g\"\nmatch = [\"1985\"]\ncoin = \"c\"\ndata = { k = \"v\" }\n");
        let report = push_details(&ws.images(), &parsed, false).unwrap();
        assert_eq!(report.updated, vec!["g/1985 (proof)/c/details.json"]);
    }

    #[test]
    fn existing_keys_are_kept_and_overridden() {
        let ws = Workspace::new();
        ws.details("g/1990/c", r#"{"weight": "old", "note": "keep me"}"#);

        let parsed = rules(
            "[[rule]]\ngroup = \"g\"\nmatch = [\"1990\"]\ncoin = \"c\"\ndata = { weight = \"new\" }\n",
        );
        push_details(&ws.images(), &parsed, false).unwrap();

        assert_eq!(
            read(&ws, "g/1990/c/details.json"),
            json!({"weight": "new", "note": "keep me"})
        );
    }

    #[test]
    fn invalid_existing_details_are_replaced() {
        let ws = Workspace::new();
        ws.details("g/1990/c", "[1, 2, 3]").details("g/1991/c", "{ oops");

        let parsed = rules(
            "[[rule]]\ngroup = \"g\"\nyears = [1990, 1992]\ncoin = \"c\"\ndata = { k = \"v\" }\n",
        );
        let report = push_details(&ws.images(), &parsed, false).unwrap();

        assert_eq!(report.count(), 2);
        assert_eq!(read(&ws, "g/1990/c/details.json"), json!({"k": "v"}));
        assert_eq!(read(&ws, "g/1991/c/details.json"), json!({"k": "v"}));
    }

    #[test]
    fn undecodable_existing_details_fail_and_are_kept() {
        let ws = Workspace::new();
        ws.dir("G/1970/C");
        let path = ws.images().join("G/1970/C/details.json");
        let original: &[u8] = b"{\"mintage\": \"1000\", \"note\": \"caf\xE9\"}";
        fs::write(&path, original).unwrap();

        let parsed = rules(
            "[[rule]]\ngroup = \"G\"\nmatch = [\"1970\"]\ncoin = \"C\"\ndata = { weight = \"5g\" }\n",
        );
        let result = push_details(&ws.images(), &parsed, false);

        assert!(matches!(result, Err(DetailsError::Io(_))));
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn output_is_indented_utf8() {
        let ws = Workspace::new();
        ws.dir("g/1990/c");

        let parsed = rules(
            "[[rule]]\ngroup = \"g\"\nmatch = [\"1990\"]\ncoin = \"c\"\ndata = { \"חומר\" = \"ניקל\" }\n",
        );
        push_details(&ws.images(), &parsed, false).unwrap();

        let raw = fs::read_to_string(ws.images().join("g/1990/c/details.json")).unwrap();
        assert_eq!(raw, "{\n    \"חומר\": \"ניקל\"\n}\n");
    }

    #[test]
    fn dry_run_counts_without_writing() {
        let ws = Workspace::new();
        ws.dir("g/1990/c");

        let parsed = rules("[[rule]]\ngroup = \"g\"\nmatch = [\"1990\"]\ncoin = \"c\"\ndata = { k = 1 }\n");
        let report = push_details(&ws.images(), &parsed, true).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.count(), 1);
        assert!(!ws.images().join("g/1990/c/details.json").exists());
    }

    #[test]
    fn missing_group_fails_before_any_write() {
        let ws = Workspace::new();
        ws.dir("g/1990/c");

        let parsed = rules(
            "[[rule]]\ngroup = \"g\"\nmatch = [\"1990\"]\ncoin = \"c\"\ndata = { k = 1 }\n\n[[rule]]\ngroup = \"typo\"\nmatch = [\"1990\"]\ncoin = \"c\"\ndata = { k = 2 }\n",
        );
        let result = push_details(&ws.images(), &parsed, false);

        assert!(matches!(result, Err(DetailsError::GroupNotFound(_))));
        assert!(!ws.images().join("g/1990/c/details.json").exists());
    }

    #[test]
    fn rule_without_needles_is_invalid() {
        let ws = Workspace::new();
        ws.dir("g/1990/c");
        let parsed = rules("[[rule]]\ngroup = \"g\"\ncoin = \"c\"\ndata = {}\n");
        assert!(matches!(
            push_details(&ws.images(), &parsed, false),
            Err(DetailsError::Invalid(_))
        ));
    }

    #[test]
    fn empty_year_range_is_invalid() {
        let ws = Workspace::new();
        ws.dir("g");
        let parsed = rules("[[rule]]\ngroup = \"g\"\nyears = [2000, 2000]\ncoin = \"c\"\ndata = {}\n");
        assert!(matches!(
            push_details(&ws.images(), &parsed, false),
            Err(DetailsError::Invalid(_))
        ));
    }

    #[test]
    fn later_rules_win() {
        let ws = Workspace::new();
        ws.dir("g/1990/c");

        let parsed = rules(
            "[[rule]]\ngroup = \"g\"\nmatch = [\"1990\"]\ncoin = \"c\"\ndata = { k = \"first\" }\n\n[[rule]]\ngroup = \"g\"\nmatch = [\"19\"]\ncoin = \"c\"\ndata = { k = \"second\" }\n",
        );
        let report = push_details(&ws.images(), &parsed, false).unwrap();

        assert_eq!(report.count(), 2);
        assert_eq!(read(&ws, "g/1990/c/details.json"), json!({"k": "second"}));
    }

    #[test]
    fn load_rules_reads_file() {
        let ws = Workspace::new();
        let path = ws.tmp.path().join("rules.toml");
        fs::write(&path, "[[rule]]\ngroup = \"g\"\nmatch = [\"1\"]\ncoin = \"c\"\ndata = {}\n").unwrap();
        assert_eq!(load_rules(&path).unwrap().rules.len(), 1);
    }
}
