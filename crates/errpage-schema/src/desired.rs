use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// How a code's custom error page changes in this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    #[serde(rename = "unchanged", alias = "nochange")]
    NoChange,
    Added,
    Modified,
    Deleted,
}

impl Directive {
    /// Whether this directive writes the code's file and therefore needs content.
    pub fn writes_file(self) -> bool {
        matches!(self, Self::Added | Self::Modified)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => write!(f, "unchanged"),
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// One code's desired state: the directive plus the page body when one is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredEntry {
    pub directive: Directive,
    pub content: Option<Vec<u8>>,
}

impl DesiredEntry {
    pub fn unchanged() -> Self {
        Self {
            directive: Directive::NoChange,
            content: None,
        }
    }

    pub fn added(content: impl Into<Vec<u8>>) -> Self {
        Self {
            directive: Directive::Added,
            content: Some(content.into()),
        }
    }

    pub fn modified(content: impl Into<Vec<u8>>) -> Self {
        Self {
            directive: Directive::Modified,
            content: Some(content.into()),
        }
    }

    pub fn deleted() -> Self {
        Self {
            directive: Directive::Deleted,
            content: None,
        }
    }
}

/// The desired-state snapshot for one reconciliation pass, keyed by the raw
/// code string exactly as the provider supplied it.
///
/// Keys are not validated here; the reconciler rejects malformed ones so that
/// the rejection is reported alongside the other per-code outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    entries: BTreeMap<String, DesiredEntry>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns the entry previously stored under `code`, which
    /// a well-behaved provider never produces.
    pub fn insert(&mut self, code: impl Into<String>, entry: DesiredEntry) -> Option<DesiredEntry> {
        self.entries.insert(code.into(), entry)
    }

    #[must_use]
    pub fn with(mut self, code: impl Into<String>, entry: DesiredEntry) -> Self {
        self.insert(code, entry);
        self
    }

    pub fn get(&self, code: &str) -> Option<&DesiredEntry> {
        self.entries.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DesiredEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, DesiredEntry)> for DesiredState {
    fn from_iter<T: IntoIterator<Item = (K, DesiredEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DesiredDocument {
    #[serde(default)]
    codes: BTreeMap<String, EntryDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryDocument {
    directive: Directive,
    #[serde(default)]
    content: Option<String>,
}

/// Parse a TOML desired-state document:
///
/// ```toml
/// [codes.404]
/// directive = "added"
/// content = "<h1>missing</h1>"
/// ```
pub fn parse_desired_str(input: &str) -> Result<DesiredState, SchemaError> {
    let doc: DesiredDocument = toml::from_str(input)?;
    Ok(doc
        .codes
        .into_iter()
        .map(|(code, entry)| {
            (
                code,
                DesiredEntry {
                    directive: entry.directive,
                    content: entry.content.map(String::into_bytes),
                },
            )
        })
        .collect())
}

pub fn parse_desired_file(path: impl AsRef<Path>) -> Result<DesiredState, SchemaError> {
    let content = fs::read_to_string(path)?;
    parse_desired_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_document() {
        let state = parse_desired_str(
            r#"
[codes.404]
directive = "added"
content = "<h1>missing</h1>"

[codes.500]
directive = "deleted"

[codes.503]
directive = "unchanged"

[codes.502]
directive = "modified"
content = "bad gateway"
"#,
        )
        .unwrap();

        assert_eq!(state.len(), 4);
        assert_eq!(
            state.get("404").unwrap(),
            &DesiredEntry::added("<h1>missing</h1>")
        );
        assert_eq!(state.get("500").unwrap(), &DesiredEntry::deleted());
        assert_eq!(state.get("503").unwrap(), &DesiredEntry::unchanged());
        assert_eq!(state.get("502").unwrap().directive, Directive::Modified);
    }

    #[test]
    fn parse_keeps_raw_keys() {
        let state = parse_desired_str(
            r#"
[codes."0404"]
directive = "added"
content = "x"
"#,
        )
        .unwrap();
        assert!(state.contains("0404"));
        assert!(!state.contains("404"));
    }

    #[test]
    fn parse_allows_missing_content() {
        let state = parse_desired_str(
            r#"
[codes.404]
directive = "added"
"#,
        )
        .unwrap();
        assert_eq!(state.get("404").unwrap().content, None);
    }

    #[test]
    fn parse_empty_document() {
        assert!(parse_desired_str("").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_unknown_directive() {
        let result = parse_desired_str(
            r#"
[codes.404]
directive = "replaced"
"#,
        );
        assert!(matches!(result, Err(SchemaError::ParseToml(_))));
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let result = parse_desired_str(
            r#"
[codes.404]
directive = "added"
content = "x"
path = "/etc/passwd"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn parse_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = parse_desired_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(SchemaError::Io(_))));
    }

    #[test]
    fn writes_file_only_for_add_and_modify() {
        assert!(Directive::Added.writes_file());
        assert!(Directive::Modified.writes_file());
        assert!(!Directive::Deleted.writes_file());
        assert!(!Directive::NoChange.writes_file());
    }

    #[test]
    fn directive_display_matches_document_names() {
        assert_eq!(Directive::NoChange.to_string(), "unchanged");
        assert_eq!(Directive::Deleted.to_string(), "deleted");
    }

    #[test]
    fn insert_reports_previous_entry() {
        let mut state = DesiredState::new();
        assert!(state.insert("404", DesiredEntry::added("a")).is_none());
        assert!(state.insert("404", DesiredEntry::added("b")).is_some());
        assert_eq!(state.len(), 1);
    }
}
