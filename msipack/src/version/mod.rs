//! Build version normalization for Windows Installer packages.
//!
//! MSI compares product versions as four 16-bit numeric fields, which leaves
//! no room for semantic-version pre-release tags, build metadata, or
//! git-describe suffixes. This module extracts the leading
//! `major.minor.patch` prefix (the "safe" version) from an arbitrary build
//! version and derives the two forms the generated WiX files need:
//!
//! - **MSI version**: `major.minor.patch.build_iteration` (e.g., `1.2.3.2`)
//! - **Display version**: `major.minor.patch` (e.g., `1.2.3`)
//!
//! Everything after the safe prefix is discarded, never encoded.
//!
//! # Examples
//!
//! ```
//! use msipack::version::normalize;
//!
//! let version = normalize("1.2.3-alpha.1+20140501194641.git.94.561b564", 2).unwrap();
//! assert_eq!(version.msi_version, "1.2.3.2");
//! assert_eq!(version.display_version, "1.2.3");
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Largest value MSI accepts in the major, minor and build fields.
pub const MSI_FIELD_MAX: u32 = 65534;

/// Errors produced while extracting a safe version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The input does not start with `major.minor.patch`.
    #[error("invalid version format: '{0}' does not start with major.minor.patch")]
    MissingPrefix(String),

    /// A numeric field exceeds [`MSI_FIELD_MAX`].
    #[error(
        "invalid version format: {field} component '{value}' of '{input}' exceeds the MSI limit of {}",
        MSI_FIELD_MAX
    )]
    FieldOverflow {
        field: VersionField,
        value: String,
        input: String,
    },
}

/// Names the component of a version that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionField {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for VersionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionField::Major => write!(f, "major"),
            VersionField::Minor => write!(f, "minor"),
            VersionField::Patch => write!(f, "patch"),
        }
    }
}

/// The `major.minor.patch` prefix of a build version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    raw: String,
}

impl SafeVersion {
    /// The prefix exactly as it appeared in the build version.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SafeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Versions derived from a build version and build iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedVersion {
    /// Four-field version written to `VersionNumber` (e.g., `1.2.3.2`).
    pub msi_version: String,

    /// Three-field version written to `DisplayVersionNumber` (e.g., `1.2.3`).
    pub display_version: String,
}

/// Leading `major.minor.patch` in ASCII digits; each run is taken in full.
fn safe_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)").unwrap())
}

/// Extract the safe `major.minor.patch` prefix from a build version.
///
/// # Errors
///
/// Returns [`VersionError::MissingPrefix`] when the input does not start with
/// three dot-separated digit runs, and [`VersionError::FieldOverflow`] when any
/// of them is larger than [`MSI_FIELD_MAX`].
///
/// # Examples
///
/// ```
/// use msipack::version::safe_version;
///
/// assert_eq!(safe_version("12.4.0+20240102").unwrap().as_str(), "12.4.0");
/// assert_eq!(safe_version("1.2.3-5-g1a2b3c4").unwrap().as_str(), "1.2.3");
/// assert!(safe_version("v1.2.3").is_err());
/// ```
pub fn safe_version(build_version: &str) -> Result<SafeVersion, VersionError> {
    let captures = safe_pattern()
        .captures(build_version)
        .ok_or_else(|| VersionError::MissingPrefix(build_version.to_string()))?;

    let field = |index: usize, name: VersionField| -> Result<u32, VersionError> {
        let digits = &captures[index];
        let overflow = || VersionError::FieldOverflow {
            field: name,
            value: digits.to_string(),
            input: build_version.to_string(),
        };
        // Runs too long for u64 are necessarily out of range as well.
        let value = digits.parse::<u64>().map_err(|_| overflow())?;
        if value > u64::from(MSI_FIELD_MAX) {
            return Err(overflow());
        }
        Ok(value as u32)
    };

    let major = field(1, VersionField::Major)?;
    let minor = field(2, VersionField::Minor)?;
    let patch = field(3, VersionField::Patch)?;

    let raw = captures[0].to_string();
    let suffix = &build_version[raw.len()..];
    if !suffix.is_empty() {
        describe_discarded(build_version, suffix);
    }

    Ok(SafeVersion {
        major,
        minor,
        patch,
        raw,
    })
}

/// Derive the MSI and display versions for a build.
///
/// The build iteration is appended as the fourth field of the MSI version and
/// never influences the display version.
///
/// # Examples
///
/// ```
/// use msipack::version::normalize;
///
/// let version = normalize("1.2.3", 2).unwrap();
/// assert_eq!(version.msi_version, "1.2.3.2");
/// assert_eq!(version.display_version, "1.2.3");
/// ```
pub fn normalize(build_version: &str, build_iteration: u32) -> Result<NormalizedVersion, VersionError> {
    let safe = safe_version(build_version)?;

    let normalized = NormalizedVersion {
        msi_version: format!("{}.{}", safe, build_iteration),
        display_version: safe.to_string(),
    };

    debug!(
        build_version,
        build_iteration,
        msi_version = %normalized.msi_version,
        display_version = %normalized.display_version,
        "Normalized build version"
    );

    Ok(normalized)
}

fn describe_discarded(build_version: &str, suffix: &str) {
    match semver::Version::parse(build_version) {
        Ok(parsed) => debug!(
            build_version,
            pre = %parsed.pre,
            build = %parsed.build,
            "Discarding semver pre-release and build metadata"
        ),
        Err(_) => debug!(build_version, suffix, "Discarding version descriptor suffix"),
    }
}
