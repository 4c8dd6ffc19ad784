//! Component versions and dependency constraints
//!
//! Component versions are free-form dotted strings as they appear in
//! repository metadata (`1.2.0`, `6.5.0-1`, `2.0beta`). Ordering compares
//! segment by segment: numeric segments numerically, text segments
//! lexically, a number ranks above text at the same position, and a trailing
//! text segment ranks below its absence, so `1.0-beta < 1.0`. Missing
//! numeric segments count as zero, so `1.0 == 1.0.0`.
//!
//! Dependencies are written `name`, `name-1.0`, `name->=1.0`, `name-<2.0`.

use ifw_errors::{Error, FormatError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Number(u64),
    Text(String),
}

/// Lenient component version
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or contains whitespace.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let raw = input.trim();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(FormatError::InvalidVersion {
                input: input.to_string(),
            }
            .into());
        }

        let mut segments = Vec::new();
        for part in raw.split(['.', '-', '_', '+']).filter(|p| !p.is_empty()) {
            let mut current = String::new();
            let mut numeric = None;
            for ch in part.chars() {
                let is_digit = ch.is_ascii_digit();
                if numeric.is_some_and(|n| n != is_digit) {
                    segments.push(Self::segment(&current));
                    current.clear();
                }
                numeric = Some(is_digit);
                current.push(ch);
            }
            if !current.is_empty() {
                segments.push(Self::segment(&current));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    fn segment(part: &str) -> Segment {
        part.parse::<u64>()
            .map_or_else(|_| Segment::Text(part.to_ascii_lowercase()), Segment::Number)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let ordering = match (self.segments.get(i), other.segments.get(i)) {
                (Some(Segment::Number(a)), Some(Segment::Number(b))) => a.cmp(b),
                (Some(Segment::Text(a)), Some(Segment::Text(b))) => a.cmp(b),
                (Some(Segment::Number(_)), Some(Segment::Text(_))) => Ordering::Greater,
                (Some(Segment::Text(_)), Some(Segment::Number(_))) => Ordering::Less,
                (Some(Segment::Number(a)), None) => a.cmp(&0),
                (None, Some(Segment::Number(b))) => 0.cmp(b),
                (Some(Segment::Text(_)), None) => Ordering::Less,
                (None, Some(Segment::Text(_))) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
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

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.raw
    }
}

/// A single version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionConstraint {
    Exact(Version),
    GreaterEqual(Version),
    LessEqual(Version),
    Greater(Version),
    Less(Version),
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version == v,
            Self::GreaterEqual(v) => version >= v,
            Self::LessEqual(v) => version <= v,
            Self::Greater(v) => version > v,
            Self::Less(v) => version < v,
        }
    }

    /// Parse `>=1.0`, `<=1.0`, `>1.0`, `<1.0`, `=1.0` or a bare version
    ///
    /// # Errors
    ///
    /// Returns an error if the version part is invalid.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let s = s.trim();
        if let Some(v) = s.strip_prefix(">=") {
            Ok(Self::GreaterEqual(Version::parse(v)?))
        } else if let Some(v) = s.strip_prefix("<=") {
            Ok(Self::LessEqual(Version::parse(v)?))
        } else if let Some(v) = s.strip_prefix('>') {
            Ok(Self::Greater(Version::parse(v)?))
        } else if let Some(v) = s.strip_prefix('<') {
            Ok(Self::Less(Version::parse(v)?))
        } else if let Some(v) = s.strip_prefix('=') {
            Ok(Self::Exact(Version::parse(v)?))
        } else {
            Ok(Self::Exact(Version::parse(s)?))
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "={v}"),
            Self::GreaterEqual(v) => write!(f, ">={v}"),
            Self::LessEqual(v) => write!(f, "<={v}"),
            Self::Greater(v) => write!(f, ">{v}"),
            Self::Less(v) => write!(f, "<{v}"),
        }
    }
}

/// Named dependency with an optional version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub constraint: Option<VersionConstraint>,
}

impl Dependency {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    /// Parse a dependency such as `app.runtime->=1.2`
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the constraint is malformed.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        let invalid = || FormatError::InvalidContent {
            file: "dependency".to_string(),
            message: format!("invalid dependency '{input}'"),
        };

        let operator_split = input
            .match_indices('-')
            .find(|(i, _)| input[i + 1..].starts_with(['<', '>', '=']))
            .map(|(i, _)| i);

        let version_split = || {
            input
                .rmatch_indices('-')
                .find(|(i, _)| input[i + 1..].starts_with(|c: char| c.is_ascii_digit()))
                .map(|(i, _)| i)
        };

        let (name, constraint) = match operator_split.or_else(version_split) {
            Some(i) => (
                &input[..i],
                Some(VersionConstraint::parse(&input[i + 1..])?),
            ),
            None => (input, None),
        };

        if name.is_empty() {
            return Err(invalid().into());
        }
        Ok(Self {
            name: name.to_string(),
            constraint,
        })
    }

    /// Parse a comma separated dependency list, skipping empty entries
    ///
    /// # Errors
    ///
    /// Returns the first malformed entry.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, Error> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    #[must_use]
    pub fn is_satisfied_by(&self, version: &Version) -> bool {
        self.constraint.as_ref().is_none_or(|c| c.matches(version))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{}-{c}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl FromStr for Dependency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
