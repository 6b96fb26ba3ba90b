//! Platform version grammar and filtering.
//!
//! A user filter is either a full `MAJOR.MINOR.PATCH` version (exact match)
//! or a `MAJOR.MINOR` line (matches any patch release of that line). Any
//! other shape is a configuration error, never a silent non-match. Omitting
//! the filter entirely means "match everything".

use crate::errors::ConfigError;

/// A parsed platform version filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionFilter {
    /// No filter supplied: every catalog version matches.
    All,
    /// `MAJOR.MINOR`: matches exactly one additional numeric patch component.
    Minor(String),
    /// `MAJOR.MINOR.PATCH`: matches only itself.
    Exact(String),
}

impl VersionFilter {
    /// Parse an optional CLI filter argument.
    ///
    /// An omitted or empty filter means match-all; a present-but-malformed
    /// filter is rejected rather than silently matching nothing.
    pub fn parse(filter: Option<&str>) -> Result<Self, ConfigError> {
        match filter {
            None | Some("") => Ok(Self::All),
            Some(f) if is_minor_version(f) => Ok(Self::Minor(f.to_string())),
            Some(f) if is_full_version(f) => Ok(Self::Exact(f.to_string())),
            Some(f) => Err(ConfigError::InvalidFilterFormat {
                filter: f.to_string(),
            }),
        }
    }

    /// Whether a concrete platform version satisfies this filter.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(version) => candidate == version,
            Self::Minor(line) => matches_minor(candidate, line),
        }
    }
}

impl std::fmt::Display for VersionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "(none)"),
            Self::Minor(line) => write!(f, "{}.*", line),
            Self::Exact(version) => write!(f, "{}", version),
        }
    }
}

/// True when `candidate` is `line` plus exactly one numeric patch component.
///
/// The boundary dot matters: `4.16` matches `4.16.2` but not `4.160.2`, and
/// a trailing suffix (`4.16.2.1`, `4.16.2-rc1`) does not match.
pub fn matches_minor(candidate: &str, line: &str) -> bool {
    let Some(rest) = candidate.strip_prefix(line) else {
        return false;
    };
    let Some(patch) = rest.strip_prefix('.') else {
        return false;
    };
    is_numeric(patch)
}

/// `MAJOR.MINOR`, both components numeric.
pub fn is_minor_version(value: &str) -> bool {
    numeric_components(value) == Some(2)
}

/// `MAJOR.MINOR.PATCH`, all components numeric.
pub fn is_full_version(value: &str) -> bool {
    numeric_components(value) == Some(3)
}

/// Kernel versions must start with `N.N.N`; a release suffix may follow
/// (`5.14.0-570.el9`) but only in the `uname -r` charset. The accepted value
/// ends up in registry tags and in workspace paths, so path separators and
/// other stray characters are treated as a resolution failure.
pub fn plausible_kernel_version(value: &str) -> bool {
    let mut rest = value;
    for component in 0..3 {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        if component < 2 {
            match rest.strip_prefix('.') {
                Some(after) => rest = after,
                None => return false,
            }
        }
    }
    rest.bytes().all(is_release_byte)
}

/// Charset of kernel release strings: alphanumerics plus `.`, `_`, `-` and
/// the `+` of locally built kernels.
fn is_release_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-' | b'+')
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Number of dot-separated components, provided all are numeric.
fn numeric_components(value: &str) -> Option<usize> {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.iter().all(|p| is_numeric(p)) {
        Some(parts.len())
    } else {
        None
    }
}

/// Sort key for `MAJOR.MINOR.PATCH` strings: numeric, not lexicographic
/// (`4.9.1` sorts before `4.10.0`).
pub fn numeric_sort_key(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
