//! Typed values stored under a node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The storage kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    ExpandString,
    #[serde(rename = "dword")]
    DWord,
    #[serde(rename = "qword")]
    QWord,
    Binary,
    MultiString,
}

/// A named value's payload, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Value {
    String(String),
    ExpandString(String),
    #[serde(rename = "dword")]
    DWord(u32),
    #[serde(rename = "qword")]
    QWord(u64),
    Binary(Vec<u8>),
    MultiString(Vec<String>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::ExpandString(_) => ValueKind::ExpandString,
            Value::DWord(_) => ValueKind::DWord,
            Value::QWord(_) => ValueKind::QWord,
            Value::Binary(_) => ValueKind::Binary,
            Value::MultiString(_) => ValueKind::MultiString,
        }
    }

    /// Returns the text payload for string kinds.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::ExpandString(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::ExpandString(s) => f.write_str(s),
            Value::DWord(n) => write!(f, "{n}"),
            Value::QWord(n) => write!(f, "{n}"),
            Value::Binary(bytes) => f.write_str(&hex::encode(bytes)),
            Value::MultiString(lines) => f.write_str(&lines.join("\n")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::DWord(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::QWord(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl From<Vec<String>> for Value {
    fn from(lines: Vec<String>) -> Self {
        Value::MultiString(lines)
    }
}

/// Booleans are stored as text so [`parse_bool`] can read them back.
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::String(if b { "True" } else { "False" }.to_string())
    }
}

/// Strict boolean parse: `true` or `false` in any letter case, surrounding
/// whitespace ignored. Anything else is `None`.
pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
