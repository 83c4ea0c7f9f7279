//! Semantic version values.
//!
//! [`Version::parse`] accepts exactly `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`.
//! [`Version::parse_tolerant`] additionally accepts inputs such as `v4.8`,
//! `4` or ` 04.08.1 ` by normalizing them first.
//!
//! Precedence ignores build metadata, so it is exposed as
//! [`Version::cmp_precedence`] rather than through `Ord`.

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

/// Reasons a version string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version string is empty")]
    Empty,
    #[error("expected MAJOR.MINOR.PATCH, found {0} component(s)")]
    ComponentCount(usize),
    #[error("invalid {component} number '{value}'")]
    InvalidNumber { component: &'static str, value: String },
    #[error("{component} number '{value}' has a leading zero")]
    LeadingZero { component: &'static str, value: String },
    #[error("invalid prerelease identifier '{0}'")]
    InvalidPrerelease(String),
    #[error("invalid build identifier '{0}'")]
    InvalidBuild(String),
    #[error("short version '{0}' cannot carry prerelease or build metadata")]
    ShortWithMetadata(String),
}

/// One dot-separated prerelease component.
///
/// Variant order matters: numeric identifiers sort before alphanumeric ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrereleaseIdentifier {
    Numeric(u64),
    Alphanumeric(String),
}

impl fmt::Display for PrereleaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrereleaseIdentifier::Numeric(n) => write!(f, "{}", n),
            PrereleaseIdentifier::Alphanumeric(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Vec<PrereleaseIdentifier>,
    pub build: Vec<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
            build: Vec::new(),
        }
    }

    /// Strict parse.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let parts: Vec<&str> = input.splitn(3, '.').collect();
        if parts.len() != 3 {
            return Err(VersionError::ComponentCount(parts.len()));
        }

        let major = parse_core("major", parts[0])?;
        let minor = parse_core("minor", parts[1])?;

        let (patch_str, prerelease_str, build_str) = split_suffixes(parts[2]);
        let patch = parse_core("patch", patch_str)?;

        let prerelease = match prerelease_str {
            Some(s) => s
                .split('.')
                .map(parse_prerelease_identifier)
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        let build = match build_str {
            Some(s) => s
                .split('.')
                .map(|ident| {
                    if is_identifier(ident) {
                        Ok(ident.to_string())
                    } else {
                        Err(VersionError::InvalidBuild(ident.to_string()))
                    }
                })
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }

    /// Permissive parse: trims whitespace, drops a leading `v`, strips
    /// leading zeros from each component and fills a missing minor or patch
    /// with `0`, then parses strictly.
    pub fn parse_tolerant(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let mut parts: Vec<String> = trimmed.splitn(3, '.').map(str::to_string).collect();
        if parts.len() < 3 {
            if let Some(last) = parts.last() {
                if last.contains(['+', '-']) {
                    return Err(VersionError::ShortWithMetadata(trimmed.to_string()));
                }
            }
            parts.resize(3, "0".to_string());
        }

        for part in parts.iter_mut() {
            if part.len() > 1 {
                let stripped = part.trim_start_matches('0');
                *part = if stripped.starts_with(|c: char| c.is_ascii_digit()) {
                    stripped.to_string()
                } else {
                    format!("0{}", stripped)
                };
            }
        }

        Self::parse(&parts.join("."))
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// Semantic-version precedence.
    ///
    /// A release sorts after any of its prereleases; prerelease lists
    /// compare pairwise, with a strict prefix sorting first.
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (self.is_prerelease(), other.is_prerelease()) {
                (false, false) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (true, true) => self.prerelease.cmp(&other.prerelease),
            })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            let idents: Vec<String> = self.prerelease.iter().map(|p| p.to_string()).collect();
            write!(f, "-{}", idents.join("."))?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build.join("."))?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split `PATCH[-PRE][+BUILD]`. The first `-` or `+` ends the patch number.
fn split_suffixes(s: &str) -> (&str, Option<&str>, Option<&str>) {
    let Some(idx) = s.find(['-', '+']) else {
        return (s, None, None);
    };
    let (patch, rest) = s.split_at(idx);
    match rest.strip_prefix('-') {
        Some(pre) => match pre.split_once('+') {
            Some((pre, build)) => (patch, Some(pre), Some(build)),
            None => (patch, Some(pre), None),
        },
        None => (patch, None, Some(&rest[1..])),
    }
}

fn parse_core(component: &'static str, value: &str) -> Result<u64, VersionError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            component,
            value: value.to_string(),
        });
    }
    if value.len() > 1 && value.starts_with('0') {
        return Err(VersionError::LeadingZero {
            component,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| VersionError::InvalidNumber {
        component,
        value: value.to_string(),
    })
}

fn parse_prerelease_identifier(ident: &str) -> Result<PrereleaseIdentifier, VersionError> {
    if !is_identifier(ident) {
        return Err(VersionError::InvalidPrerelease(ident.to_string()));
    }
    if !ident.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(PrereleaseIdentifier::Alphanumeric(ident.to_string()));
    }
    if ident.len() > 1 && ident.starts_with('0') {
        return Err(VersionError::InvalidPrerelease(ident.to_string()));
    }
    ident
        .parse()
        .map(PrereleaseIdentifier::Numeric)
        .map_err(|_| VersionError::InvalidPrerelease(ident.to_string()))
}

/// Non-empty and made of `[0-9A-Za-z-]`.
fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
