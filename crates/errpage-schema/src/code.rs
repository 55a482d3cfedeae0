//! HTTP status codes and the allow-list of codes the proxy can customize.

use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Statuses the proxy accepts an `errorfile` directive for.
pub const DEFAULT_SUPPORTED_CODES: [u16; 15] = [
    200, 400, 401, 403, 404, 405, 407, 408, 410, 425, 429, 500, 502, 503, 504,
];

/// A well-formed HTTP status code.
///
/// Parsing is strict: exactly three ASCII digits, first digit 1-5. `"0404"`,
/// `" 404"`, `"+404"` and `"404\n"` are all rejected, so a parsed code is always
/// safe to use as a filename and compares equal only to its canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusCode(u16);

impl StatusCode {
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 3
            && bytes.iter().all(u8::is_ascii_digit)
            && (b'1'..=b'5').contains(&bytes[0]);
        if !well_formed {
            return Err(SchemaError::InvalidCode(s.to_owned()));
        }
        let value = bytes
            .iter()
            .fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
        Ok(Self(value))
    }

    pub fn from_u16(value: u16) -> Result<Self, SchemaError> {
        if (100..600).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SchemaError::InvalidCode(value.to_string()))
        }
    }

    #[inline]
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Filename used for this code in the error-file store.
    #[inline]
    pub fn file_name(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StatusCode {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StatusCode {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<StatusCode> for String {
    fn from(code: StatusCode) -> Self {
        code.file_name()
    }
}

/// The fixed, ordered set of status codes eligible for a custom error page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedCodeSet {
    codes: Vec<StatusCode>,
}

impl SupportedCodeSet {
    pub fn new(codes: impl IntoIterator<Item = StatusCode>) -> Self {
        let mut codes: Vec<StatusCode> = codes.into_iter().collect();
        codes.sort_unstable();
        codes.dedup();
        Self { codes }
    }

    /// Build a set from string codes, failing on the first malformed entry.
    pub fn parse<I, S>(codes: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = codes
            .into_iter()
            .map(|s| StatusCode::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(parsed))
    }

    pub fn contains(&self, code: StatusCode) -> bool {
        self.codes.binary_search(&code).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = StatusCode> + '_ {
        self.codes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Default for SupportedCodeSet {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_CODES.iter().map(|&c| StatusCode(c)))
    }
}
