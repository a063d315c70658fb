//! # BUILD-INFO Parser
//!
//! `BUILD-INFO.txt` is a `Key: value` text file placed in a published
//! directory. It describes one or more records; each record may carry a
//! `Files-Pattern` (comma-separated globs), a `License-Type` (`open` or
//! `protected`), a `Theme`, `Auth-Groups` and a `License-Text`.
//!
//! ## Grammar
//!
//! - A line matching `^(\S+)\s*:\s*(.*)$` sets a key (lower-cased) in the
//!   current record. If the record already holds that key, a new record is
//!   started first. A repeated key is the only record boundary; blank lines
//!   are not.
//! - `License-Text` is the only multi-line key. A non-matching line that
//!   follows it (or one of its continuation lines) is appended with a single
//!   space.
//! - Any other non-matching line is skipped.
//! - Input with no parseable lines is one empty record, never an error.
//!
//! The deprecated key `OpenID-Launchpad-Teams` is read as `Auth-Groups`.

use std::sync::OnceLock;

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const LICENSE_TEXT: &str = "license-text";
pub const LICENSE_TYPE: &str = "license-type";
pub const FILES_PATTERN: &str = "files-pattern";
pub const AUTH_GROUPS: &str = "auth-groups";
pub const THEME: &str = "theme";
pub const FORMAT_VERSION: &str = "format-version";

const MULTI_LINE_KEYS: &[&str] = &[LICENSE_TEXT];

const RENAMED_KEYS: &[(&str, &str)] = &[("openid-launchpad-teams", AUTH_GROUPS)];

fn key_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+)\s*:\s*(.*)$").unwrap())
}

/// One record: an ordered key/value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfoRecord {
    fields: Vec<(String, String)>,
}

impl BuildInfoRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn set(&mut self, key: String, value: String) {
        self.fields.push((key, value));
    }

    fn value_mut(&mut self, key: &str) -> Option<&mut String> {
        self.fields
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Whether this record applies to `file_name`.
    ///
    /// A record without `Files-Pattern` applies to everything. Otherwise
    /// any comma-separated entry must equal the name or glob-match it.
    pub fn governs(&self, file_name: &str) -> bool {
        let Some(patterns) = self.get(FILES_PATTERN) else {
            return true;
        };
        patterns
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .any(|p| {
                p == file_name
                    || glob::Pattern::new(p)
                        .map(|g| g.matches(file_name))
                        .unwrap_or(false)
            })
    }
}

impl Serialize for BuildInfoRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parsed `BUILD-INFO.txt`: at least one record, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfoDocument {
    records: Vec<BuildInfoRecord>,
}

impl BuildInfoDocument {
    /// A document with a single empty record.
    pub fn empty() -> Self {
        Self {
            records: vec![BuildInfoRecord::default()],
        }
    }

    /// Parse raw bytes. Invalid UTF-8 is replaced, not rejected.
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(raw))
    }

    pub fn parse(raw: &str) -> Self {
        let mut records = vec![BuildInfoRecord::default()];
        let mut continuing: Option<String> = None;

        for (line_no, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = key_value_re().captures(line) {
                let mut key = caps[1].to_lowercase();
                if let Some((_, new)) = RENAMED_KEYS.iter().find(|(old, _)| *old == key) {
                    key = (*new).to_string();
                }
                let value = caps[2].trim_end().to_string();

                if records[records.len() - 1].contains_key(&key) {
                    records.push(BuildInfoRecord::default());
                }
                let last = records.len() - 1;
                continuing = MULTI_LINE_KEYS.contains(&key.as_str()).then(|| key.clone());
                records[last].set(key, value);
                continue;
            }

            let last = records.len() - 1;
            match continuing
                .as_deref()
                .and_then(|key| records[last].value_mut(key))
            {
                Some(value) => {
                    let text = line.trim();
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(text);
                }
                None => {
                    tracing::debug!(line = line_no + 1, "skipping unparseable BUILD-INFO line");
                }
            }
        }

        Self { records }
    }

    /// Number of records. Always at least one.
    pub fn max_index(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[BuildInfoRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&BuildInfoRecord> {
        self.records.get(index)
    }

    /// Value of `key` in record `index`; `None` when either is missing.
    pub fn get(&self, key: &str, index: usize) -> Option<&str> {
        self.records.get(index).and_then(|r| r.get(key))
    }

    /// Value of `key` in record `index`, falling back to record 0.
    ///
    /// `License-Type`, `Auth-Groups` and `Theme` declared once at the top
    /// of a file apply to every record below it.
    pub fn inherited(&self, key: &str, index: usize) -> Option<&str> {
        self.get(key, index).or_else(|| self.get(key, 0))
    }

    /// First `Format-Version` declared anywhere in the file.
    pub fn format_version(&self) -> Option<&str> {
        self.records.iter().find_map(|r| r.get(FORMAT_VERSION))
    }

    /// Group names declared for record `index` (inherited from record 0).
    pub fn auth_groups(&self, index: usize) -> Vec<String> {
        self.inherited(AUTH_GROUPS, index)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The records that govern one file, or every record for a directory.
    ///
    /// `None` keeps all records: a directory-level query reports every
    /// sub-license in the file regardless of `Files-Pattern`. For a file,
    /// records whose pattern does not match are dropped. When nothing is
    /// left the result is a single empty record, which resolves to deny.
    pub fn scoped_to(&self, file_name: Option<&str>) -> Self {
        let Some(name) = file_name else {
            return self.clone();
        };
        let records: Vec<_> = self
            .records
            .iter()
            .filter(|r| r.governs(name))
            .cloned()
            .collect();
        if records.is_empty() {
            Self::empty()
        } else {
            Self { records }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = "\
Format-Version: 0.5

Files-Pattern: *.img
License-Type: protected
Theme: samsung
License-Text: First license
 spanning two lines.

Files-Pattern: *.txt, README
License-Type: open
";

    #[test]
    fn single_record() {
        let doc = BuildInfoDocument::parse("License-Type: protected\nLicense-Text: Sample text\n");
        assert_eq!(doc.max_index(), 1);
        assert_eq!(doc.get(LICENSE_TYPE, 0), Some("protected"));
        assert_eq!(doc.get(LICENSE_TEXT, 0), Some("Sample text"));
    }

    #[test]
    fn repeated_key_starts_new_record() {
        let doc = BuildInfoDocument::parse(TWO_RECORDS);
        assert_eq!(doc.max_index(), 2);
        assert_eq!(doc.format_version(), Some("0.5"));
        assert_eq!(doc.get(FILES_PATTERN, 0), Some("*.img"));
        assert_eq!(doc.get(THEME, 0), Some("samsung"));
        assert_eq!(doc.get(FILES_PATTERN, 1), Some("*.txt, README"));
        assert_eq!(doc.get(LICENSE_TYPE, 1), Some("open"));
        assert_eq!(doc.get(THEME, 1), None);
    }

    #[test]
    fn license_text_continuation_is_space_joined() {
        let doc = BuildInfoDocument::parse(TWO_RECORDS);
        assert_eq!(
            doc.get(LICENSE_TEXT, 0),
            Some("First license spanning two lines.")
        );
    }

    #[test]
    fn continuation_survives_blank_lines() {
        let doc = BuildInfoDocument::parse("License-Text: one\n\n  two\n\nthree\n");
        assert_eq!(doc.get(LICENSE_TEXT, 0), Some("one two three"));
    }

    #[test]
    fn continuation_only_follows_license_text() {
        let doc = BuildInfoDocument::parse("Theme: linaro\nnot a key value line\n");
        assert_eq!(doc.get(THEME, 0), Some("linaro"));
        assert_eq!(doc.record(0).unwrap().len(), 1);
    }

    #[test]
    fn continuation_ends_at_next_key() {
        let doc = BuildInfoDocument::parse("License-Text: a\nmore\nTheme: x\nstray\n");
        assert_eq!(doc.get(LICENSE_TEXT, 0), Some("a more"));
        assert_eq!(doc.get(THEME, 0), Some("x"));
    }

    #[test]
    fn empty_license_text_takes_first_continuation_verbatim() {
        let doc = BuildInfoDocument::parse("License-Text:\n  Body here\n");
        assert_eq!(doc.get(LICENSE_TEXT, 0), Some("Body here"));
    }

    #[test]
    fn keys_are_case_insensitive() {
        let doc = BuildInfoDocument::parse("LICENSE-TYPE: open\nlicense-type: protected\n");
        assert_eq!(doc.max_index(), 2);
        assert_eq!(doc.get(LICENSE_TYPE, 0), Some("open"));
        assert_eq!(doc.get(LICENSE_TYPE, 1), Some("protected"));
    }

    #[test]
    fn deprecated_teams_key_is_renamed() {
        let doc = BuildInfoDocument::parse("OpenID-Launchpad-Teams: linaro, partners\n");
        assert_eq!(doc.auth_groups(0), vec!["linaro", "partners"]);
        assert!(!doc.record(0).unwrap().contains_key("openid-launchpad-teams"));
    }

    #[test]
    fn garbage_yields_one_empty_record() {
        let doc = BuildInfoDocument::parse("this is\nnot\nbuild info\n");
        assert_eq!(doc.max_index(), 1);
        assert!(doc.record(0).unwrap().is_empty());

        let empty = BuildInfoDocument::parse("");
        assert_eq!(empty, BuildInfoDocument::empty());
    }

    #[test]
    fn get_out_of_range_is_none() {
        let doc = BuildInfoDocument::parse("Theme: linaro\n");
        assert_eq!(doc.get(THEME, 1), None);
        assert_eq!(doc.get("missing", 0), None);
    }

    #[test]
    fn inherited_falls_back_to_first_record() {
        let doc = BuildInfoDocument::parse(
            "License-Type: protected\nLicense-Text: A\nLicense-Text: B\n",
        );
        assert_eq!(doc.max_index(), 2);
        assert_eq!(doc.get(LICENSE_TYPE, 1), None);
        assert_eq!(doc.inherited(LICENSE_TYPE, 1), Some("protected"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let doc = BuildInfoDocument::from_bytes(b"Theme: lin\xffaro\n");
        assert_eq!(doc.get(THEME, 0), Some("lin\u{fffd}aro"));
    }

    #[test]
    fn scoping_selects_matching_records() {
        let doc = BuildInfoDocument::parse(TWO_RECORDS);

        let img = doc.scoped_to(Some("rootfs.img"));
        assert_eq!(img.max_index(), 1);
        assert_eq!(img.get(LICENSE_TYPE, 0), Some("protected"));

        let readme = doc.scoped_to(Some("README"));
        assert_eq!(readme.get(LICENSE_TYPE, 0), Some("open"));

        let other = doc.scoped_to(Some("kernel.bin"));
        assert_eq!(other, BuildInfoDocument::empty());

        assert_eq!(doc.scoped_to(None), doc);
    }

    #[test]
    fn record_without_pattern_governs_everything() {
        let doc = BuildInfoDocument::parse("License-Type: open\n");
        assert_eq!(doc.scoped_to(Some("anything.tar.gz")).max_index(), 1);
    }

    #[test]
    fn record_serializes_in_file_order() {
        let doc = BuildInfoDocument::parse("Theme: z\nLicense-Type: open\n");
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"records":[{"theme":"z","license-type":"open"}]}"#
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn key_strategy() -> impl Strategy<Value = &'static str> {
            prop::sample::select(vec![
                "Files-Pattern",
                "License-Type",
                "Theme",
                "Auth-Groups",
                "Build-Name",
            ])
        }

        proptest! {
            #[test]
            fn max_index_counts_record_starts(keys in prop::collection::vec(key_strategy(), 0..40)) {
                let mut expected = 1usize;
                let mut seen = HashSet::new();
                let mut raw = String::new();
                for (i, k) in keys.iter().enumerate() {
                    let lower = k.to_lowercase();
                    if !seen.insert(lower.clone()) {
                        expected += 1;
                        seen.clear();
                        seen.insert(lower);
                    }
                    raw.push_str(&format!("{k}: v{i}\n\n"));
                }
                let doc = BuildInfoDocument::parse(&raw);
                prop_assert_eq!(doc.max_index(), expected);
            }

            #[test]
            fn parse_never_fails(raw in ".{0,400}") {
                let doc = BuildInfoDocument::parse(&raw);
                prop_assert!(doc.max_index() >= 1);
            }
        }
    }
}
