//! Extension qualifiers
//!
//! A qualifier names one candidate extension as a `"name": "version"` pair,
//! the same shape the entry takes inside a package.json `dependencies` map.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One extension to measure, identified by package name and version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    name: String,
    version: String,
}

impl Qualifier {
    /// Create a qualifier from an already split name and version
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse `"name": "version"`.
    ///
    /// When the name is quoted, the split happens at the first colon after its
    /// closing quote, so both names and versions may contain colons. Unquoted
    /// input has its quote characters stripped and is split on the last colon.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();

        let (name, version) = match trimmed.strip_prefix('"') {
            Some(rest) => split_quoted(rest),
            None => split_last_colon(trimmed),
        }
        .ok_or_else(|| Error::invalid_qualifier(input))?;

        if name.is_empty() || version.is_empty() {
            return Err(Error::invalid_qualifier(input));
        }

        Ok(Self { name, version })
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version string as written into `dependencies`
    pub fn version(&self) -> &str {
        &self.version
    }
}

fn split_quoted(rest: &str) -> Option<(String, String)> {
    let end = rest.find('"')?;
    let name = &rest[..end];
    let version = rest[end + 1..].trim_start().strip_prefix(':')?;
    Some((name.to_string(), unquote(version)))
}

fn split_last_colon(input: &str) -> Option<(String, String)> {
    let stripped: String = input.chars().filter(|c| *c != '"').collect();
    let (name, version) = stripped.rsplit_once(':')?;
    Some((name.trim().to_string(), version.trim().to_string()))
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').trim().to_string()
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\": \"{}\"", self.name, self.version)
    }
}

impl FromStr for Qualifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
