//! Error types for the MSI packager.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::toolchain::ToolchainError;
use crate::version::VersionError;

/// Result type for packager operations.
pub type PackagerResult<T> = Result<T, PackagerError>;

/// Errors that can occur while packaging.
#[derive(Debug)]
pub enum PackagerError {
    /// A required attribute was read before it was set.
    MissingRequiredAttribute { attribute: &'static str },

    /// A value of the wrong shape was supplied to a setter.
    InvalidValue {
        attribute: &'static str,
        reason: String,
    },

    /// The build version has no usable `major.minor.patch` prefix.
    InvalidVersionFormat(VersionError),

    /// Failed to create directory.
    CreateDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// The XML writer rejected a generated document.
    RenderFailed { file: &'static str, message: String },

    /// An external tool failed.
    Toolchain(ToolchainError),
}

impl fmt::Display for PackagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackagerError::MissingRequiredAttribute { attribute } => {
                write!(f, "missing required attribute '{}'", attribute)
            }
            PackagerError::InvalidValue { attribute, reason } => {
                write!(f, "invalid value for '{}': {}", attribute, reason)
            }
            PackagerError::InvalidVersionFormat(err) => write!(f, "{}", err),
            PackagerError::CreateDirectoryFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            PackagerError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            PackagerError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            PackagerError::RenderFailed { file, message } => {
                write!(f, "failed to render {}: {}", file, message)
            }
            PackagerError::Toolchain(err) => write!(f, "packaging failed: {}", err),
        }
    }
}

impl std::error::Error for PackagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PackagerError::InvalidVersionFormat(err) => Some(err),
            PackagerError::CreateDirectoryFailed { source, .. } => Some(source),
            PackagerError::ReadFailed { source, .. } => Some(source),
            PackagerError::WriteFailed { source, .. } => Some(source),
            PackagerError::Toolchain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VersionError> for PackagerError {
    fn from(err: VersionError) -> Self {
        PackagerError::InvalidVersionFormat(err)
    }
}

impl From<ToolchainError> for PackagerError {
    fn from(err: ToolchainError) -> Self {
        PackagerError::Toolchain(err)
    }
}
