//! CLI error type.

use std::error::Error;
use std::fmt;

use msipack::packager::PackagerError;
use msipack::project::ConfigError;
use msipack::toolchain::ToolchainError;
use msipack::version::VersionError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// The project definition could not be loaded.
    Config(ConfigError),
    /// Rendering or packaging failed.
    Packager(PackagerError),
    /// The WiX toolset is missing or unusable.
    Toolchain(ToolchainError),
    /// The build version could not be normalized.
    Version(VersionError),
    /// A command-line value was malformed.
    InvalidArgument(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Packager(e) => write!(f, "{}", e),
            CliError::Toolchain(e) => write!(f, "{}", e),
            CliError::Version(e) => write!(f, "{}", e),
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error for CliError {
    // The wrapped error's message is already shown by Display, so the chain
    // continues from its source.
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Config(e) => e.source(),
            CliError::Packager(e) => e.source(),
            CliError::Toolchain(e) => e.source(),
            CliError::Version(e) => e.source(),
            CliError::InvalidArgument(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err)
    }
}

impl From<PackagerError> for CliError {
    fn from(err: PackagerError) -> Self {
        CliError::Packager(err)
    }
}

impl From<ToolchainError> for CliError {
    fn from(err: ToolchainError) -> Self {
        CliError::Toolchain(err)
    }
}

impl From<VersionError> for CliError {
    fn from(err: VersionError) -> Self {
        CliError::Version(err)
    }
}
