//! Domain Names
//!
//! Dotted names made of validated, lower-cased labels. The root domain is
//! written `.` and has no labels.

use crate::error::{Error, Result};
use std::str::FromStr;

/// Maximum length of a single label
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a full dotted name
pub const MAX_NAME_LEN: usize = 253;

/// Validate one label and return its normalized (lower-case) form
pub fn normalize_label(label: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidName {
        name: label.to_string(),
        reason: reason.to_string(),
    };

    if label.is_empty() {
        return Err(invalid("empty label"));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(invalid("label longer than 63 characters"));
    }
    if !label
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-')
    {
        return Err(invalid("labels may only contain letters, digits and '-'"));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(invalid("labels may not start or end with '-'"));
    }

    Ok(label.to_ascii_lowercase())
}

/// A dotted domain name, leaf label first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DomainName {
    labels: Vec<String>,
}

impl DomainName {
    /// The root domain
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted name; `.` is the root and a trailing dot is accepted
    pub fn parse(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed == "." {
            return Ok(Self::root());
        }
        if trimmed.is_empty() {
            return Err(Error::InvalidName {
                name: name.to_string(),
                reason: "empty name".to_string(),
            });
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(Error::InvalidName {
                name: name.to_string(),
                reason: "name longer than 253 characters".to_string(),
            });
        }

        let labels = trimmed
            .strip_suffix('.')
            .unwrap_or(trimmed)
            .split('.')
            .map(normalize_label)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { labels })
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// The leftmost label; this is the name a node registers under
    pub fn leaf_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Labels of `self` that sit below `zone`, leaf first.
    ///
    /// Returns `None` when `self` is not `zone` or a descendant of it, and
    /// an empty slice when the two names are equal.
    pub fn relative_to(&self, zone: &DomainName) -> Option<&[String]> {
        let depth = self.labels.len().checked_sub(zone.labels.len())?;
        if self.labels[depth..] == zone.labels[..] {
            Some(&self.labels[..depth])
        } else {
            None
        }
    }
}

impl std::fmt::Display for DomainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.labels.join("."))
        }
    }
}

impl FromStr for DomainName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
