//! Key paths.
//!
//! A raw path such as `Software\Vendor/App  Settings` is normalized by
//! collapsing runs of spaces and then split on either `\` or `/`. Empty
//! segments are dropped, so `a\\b` and `a/b/` both name the same two nodes.

use std::fmt;
use std::str::FromStr;

/// Characters accepted as segment separators.
pub const SEPARATORS: [char; 2] = ['\\', '/'];

/// An ordered sequence of non-empty segment names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// The zero-segment path, naming the root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalizes and splits a raw path string.
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize_spaces(raw);
        let segments = normalized
            .split(SEPARATORS)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Returns the path without its final segment, or `None` at the root.
    pub fn parent(&self) -> Option<KeyPath> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// Appends a raw (possibly multi-segment) path.
    pub fn join(&self, raw: &str) -> KeyPath {
        let mut segments = self.segments.clone();
        segments.extend(KeyPath::parse(raw).segments);
        Self { segments }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("\\"))
    }
}

impl FromStr for KeyPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for KeyPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for KeyPath {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<&KeyPath> for KeyPath {
    fn from(path: &KeyPath) -> Self {
        path.clone()
    }
}

/// Collapses every run of consecutive spaces into a single space.
///
/// Only the space character is affected; tabs and other whitespace are kept.
pub fn normalize_spaces(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_space = false;
    for ch in raw.chars() {
        if ch == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
        } else {
            prev_space = false;
        }
        out.push(ch);
    }
    out
}

/// Case-insensitive, locale-independent segment comparison.
pub fn segments_match(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.to_lowercase() == b.to_lowercase()
}
