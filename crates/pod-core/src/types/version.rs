//! Version and version range types.
//!
//! Provides a semantic version with a total precedence ordering and an
//! interval-notation version range, which together are the only primitives
//! the resolver consults when testing a dependency edge.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
///
/// Build metadata is carried for display only and never affects ordering or
/// equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Range of acceptable versions in interval notation
///
/// `1.0` means `>= 1.0`, `[1.0]` is an exact match, `[1.0,2.0)` is a half-open
/// interval and `*` accepts every version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    min: Option<Version>,
    min_inclusive: bool,
    max: Option<Version>,
    max_inclusive: bool,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number '{component}' in version {input}")]
    InvalidNumber { input: String, component: String },

    #[error("Invalid prerelease identifier in version {input}")]
    InvalidPrerelease { input: String },

    #[error("Invalid build metadata in version {input}")]
    InvalidBuild { input: String },

    #[error("Invalid version range {input}: {reason}")]
    InvalidRange { input: String, reason: String },
}

impl VersionError {
    /// The text that failed to parse
    pub fn input(&self) -> &str {
        match self {
            VersionError::InvalidFormat { input }
            | VersionError::InvalidNumber { input, .. }
            | VersionError::InvalidPrerelease { input }
            | VersionError::InvalidBuild { input }
            | VersionError::InvalidRange { input, .. } => input,
        }
    }
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        Self::from_str(input)
    }

    /// Attach a prerelease label
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = Some(prerelease.into());
        self
    }

    /// Check if this version satisfies a version range
    pub fn satisfies(&self, range: &VersionRange) -> bool {
        range.satisfies(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch)) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less, // prerelease < normal
                (None, Some(_)) => Ordering::Greater, // normal > prerelease
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers
///
/// Numeric identifiers compare numerically and sort below alphanumeric ones;
/// a shorter identifier list sorts first when all shared identifiers match.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    // Leading zeros keep otherwise equal numbers distinct
                    (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| x.cmp(y)),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn valid_identifiers(part: &str) -> bool {
    part.split('.').all(|ident| {
        !ident.is_empty() && ident.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        // Split on '+' for build metadata
        let (version_part, build) = match input.split_once('+') {
            Some((v, b)) => {
                if !valid_identifiers(b) {
                    return Err(VersionError::InvalidBuild {
                        input: input.to_string(),
                    });
                }
                (v, Some(b.to_string()))
            },
            None => (input, None),
        };

        // Split on '-' for prerelease
        let (core_part, prerelease) = match version_part.split_once('-') {
            Some((c, p)) => {
                if !valid_identifiers(p) {
                    return Err(VersionError::InvalidPrerelease {
                        input: input.to_string(),
                    });
                }
                (c, Some(p.to_string()))
            },
            None => (version_part, None),
        };

        // Parse major[.minor[.patch]], missing components are zero
        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| VersionError::InvalidNumber {
                input: input.to_string(),
                component: part.to_string(),
            })?;
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            prerelease,
            build,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.precedence_cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.prerelease.hash(state);
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl VersionRange {
    /// The range accepting every version
    pub fn all() -> Self {
        Self {
            min: None,
            min_inclusive: false,
            max: None,
            max_inclusive: false,
        }
    }

    /// The range accepting exactly one version
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// The range accepting `version` and everything above it
    pub fn at_least(version: Version) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// Build a range from explicit bounds
    pub fn new(
        min: Option<Version>,
        min_inclusive: bool,
        max: Option<Version>,
        max_inclusive: bool,
    ) -> Result<Self, VersionError> {
        let range = Self {
            min_inclusive: min.is_some() && min_inclusive,
            max_inclusive: max.is_some() && max_inclusive,
            min,
            max,
        };
        range.validate()?;
        Ok(range)
    }

    /// Parse a range in interval notation
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::all());
        }

        let invalid = |reason: &str| VersionError::InvalidRange {
            input: trimmed.to_string(),
            reason: reason.to_string(),
        };

        let first = trimmed.chars().next().unwrap_or_default();
        if first != '[' && first != '(' {
            // A bare version is a minimum, inclusive
            return Ok(Self::at_least(Version::from_str(trimmed)?));
        }

        let last = trimmed.chars().last().unwrap_or_default();
        if last != ']' && last != ')' {
            return Err(invalid("missing closing bracket"));
        }
        let min_inclusive = first == '[';
        let max_inclusive = last == ']';
        let inner = &trimmed[1..trimmed.len() - 1];

        let mut parts = inner.split(',');
        let lower = parts.next().unwrap_or_default().trim();
        let upper = parts.next();
        if parts.next().is_some() {
            return Err(invalid("too many commas"));
        }

        let range = match upper {
            None => {
                if !(min_inclusive && max_inclusive) || lower.is_empty() {
                    return Err(invalid("an exact version must use square brackets"));
                }
                Self::exact(Version::from_str(lower)?)
            },
            Some(upper) => {
                let upper = upper.trim();
                let min = if lower.is_empty() {
                    None
                } else {
                    Some(Version::from_str(lower)?)
                };
                let max = if upper.is_empty() {
                    None
                } else {
                    Some(Version::from_str(upper)?)
                };
                Self {
                    min_inclusive: min.is_some() && min_inclusive,
                    max_inclusive: max.is_some() && max_inclusive,
                    min,
                    max,
                }
            },
        };

        range.validate().map_err(|_| invalid("the range cannot contain any version"))?;
        Ok(range)
    }

    fn validate(&self) -> Result<(), VersionError> {
        if let (Some(min), Some(max)) = (&self.min, &self.max) {
            let empty = match min.cmp(max) {
                Ordering::Greater => true,
                Ordering::Equal => !(self.min_inclusive && self.max_inclusive),
                Ordering::Less => false,
            };
            if empty {
                return Err(VersionError::InvalidRange {
                    input: self.to_string(),
                    reason: "the range cannot contain any version".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check if a version falls inside this range
    pub fn satisfies(&self, version: &Version) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }

    /// Check if this is the range accepting every version
    pub fn is_all(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The single version this range accepts, if it is an exact range
    pub fn exact_version(&self) -> Option<&Version> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if self.min_inclusive && self.max_inclusive && min == max => {
                Some(min)
            },
            _ => None,
        }
    }

    /// Lower bound, if any
    pub fn min(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    /// Upper bound, if any
    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    /// Human readable form used in diagnostics, e.g. `(>= 1.0.0 && < 2.0.0)`
    ///
    /// The range accepting every version renders as an empty string.
    pub fn pretty(&self) -> String {
        if let Some(exact) = self.exact_version() {
            return format!("(= {})", exact);
        }

        let mut bounds = Vec::with_capacity(2);
        if let Some(min) = &self.min {
            let op = if self.min_inclusive { ">=" } else { ">" };
            bounds.push(format!("{} {}", op, min));
        }
        if let Some(max) = &self.max {
            let op = if self.max_inclusive { "<=" } else { "<" };
            bounds.push(format!("{} {}", op, max));
        }

        if bounds.is_empty() {
            String::new()
        } else {
            format!("({})", bounds.join(" && "))
        }
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_all() {
            return write!(f, "*");
        }
        if let Some(exact) = self.exact_version() {
            return write!(f, "[{}]", exact);
        }

        write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
        if let Some(min) = &self.min {
            write!(f, "{}", min)?;
        }
        write!(f, ", ")?;
        if let Some(max) = &self.max {
            write!(f, "{}", max)?;
        }
        write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
    }
}
