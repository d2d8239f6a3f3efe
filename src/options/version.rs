use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::VersionError;

/// Dotted numeric version (e.g. `2.10.0`).
///
/// Ordering is component-wise numeric, never lexical, and missing trailing
/// components count as zero, so `2.0` == `2.0.0` and `2.10.0` > `2.9.0`.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
    raw: String,
}

impl Version {
    /// Parse a dotted numeric version string. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }
        let parts = trimmed
            .split('.')
            .map(|seg| {
                seg.parse::<u64>()
                    .map_err(|_| VersionError::InvalidSegment {
                        input: trimmed.to_string(),
                        segment: seg.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            parts,
            raw: trimmed.to_string(),
        })
    }

    /// Read a version out of a stored option value. Anything that is not a
    /// parsable string yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| Self::parse(s).ok())
    }

    /// The version as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn component(&self, idx: usize) -> u64 {
        self.parts.get(idx).copied().unwrap_or(0)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// True when `input` is a parsable dotted numeric version.
pub fn is_valid(input: &str) -> bool {
    Version::parse(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn numeric_not_lexical() {
        assert!(v("2.10.0") > v("2.9.0"));
        assert!(v("10.0") > v("9.99.99"));
        assert!(v("2.0.3") < v("2.0.10"));
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(v("2.0"), v("2.0.0"));
        assert!(v("2") < v("2.0.1"));
        assert_eq!(v("2.0").as_str(), "2.0");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Version::parse(""), Err(VersionError::Empty));
        assert!(matches!(
            Version::parse("2.x.1"),
            Err(VersionError::InvalidSegment { segment, .. }) if segment == "x"
        ));
        assert!(!is_valid("1..2"));
        assert!(is_valid(" 1.2.3 "));
    }

    #[test]
    fn from_value_requires_string() {
        assert_eq!(Version::from_value(&json!("1.4")), Some(v("1.4")));
        assert!(Version::from_value(&json!(2)).is_none());
        assert!(Version::from_value(&json!(null)).is_none());
        assert!(Version::from_value(&json!("nope")).is_none());
    }
}
