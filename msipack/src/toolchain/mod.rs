//! External toolchain that turns the generated WiX files into an MSI.
//!
//! The packager only writes source, parameter and localization files. Turning
//! them into a package is delegated to a [`Toolchain`]:
//!
//! 1. `compile` - harvest the staged tree and compile all sources to objects
//! 2. `link` - link the objects and localization into the `.msi`
//! 3. `sign` - optionally sign the finished package
//!
//! [`WixToolchain`] drives the WiX v3 binaries (`heat`, `candle`, `light`)
//! plus `signtool`. Any non-zero exit is fatal and is never retried.

mod wix;

pub use wix::{windows_path, WixToolchain, HARVEST_COMPONENT_GROUP, HARVEST_FILE};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for toolchain operations.
pub type ToolchainResult<T> = Result<T, ToolchainError>;

/// Errors raised by external tool invocations.
#[derive(Debug, Error)]
pub enum ToolchainError {
    /// The tool could not be started.
    #[error("'{tool}' could not be run: {source}. Is the WiX toolset on PATH?")]
    NotFound {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited unsuccessfully.
    #[error("'{tool}' failed with {}: {}", describe_status(.status), diagnostics(.stdout, .stderr))]
    Failed {
        tool: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

// WiX reports its errors on stdout.
fn diagnostics<'a>(stdout: &'a str, stderr: &'a str) -> &'a str {
    match stderr.trim() {
        "" => stdout.trim(),
        stderr => stderr,
    }
}

/// Code signing settings passed through to the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningParams {
    /// SHA-1 thumbprint of the certificate in the machine store.
    pub thumbprint: String,

    /// RFC 3161 timestamp server.
    pub timestamp_url: Option<String>,
}

impl SigningParams {
    /// Sign with the certificate identified by `thumbprint`.
    pub fn new(thumbprint: impl Into<String>) -> Self {
        Self {
            thumbprint: thumbprint.into(),
            timestamp_url: None,
        }
    }

    /// Timestamp the signature using the given server.
    pub fn with_timestamp_url(mut self, url: impl Into<String>) -> Self {
        self.timestamp_url = Some(url.into());
        self
    }
}

/// Everything the toolchain needs to produce a package.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Directory holding the generated files; also receives object files.
    pub staging_dir: PathBuf,

    /// Staged application tree to harvest.
    pub install_dir: PathBuf,

    /// `localization-en-us.wxl`
    pub localization_file: PathBuf,

    /// `parameters.wxi`; its directory is added to the compiler's include path.
    pub parameters_file: PathBuf,

    /// `source.wxs`
    pub source_file: PathBuf,

    /// Bind path for installer resources.
    pub resources_dir: PathBuf,

    /// Upgrade code of the product family.
    ///
    /// The rendered parameters file already defines it, so [`WixToolchain`]
    /// does not pass it again; it is here for toolchains that need it.
    pub upgrade_code: String,

    /// Final `.msi` path.
    pub package_path: PathBuf,

    /// Signing settings, when the package must be signed.
    pub signing: Option<SigningParams>,
}

/// An external compiler/linker for WiX sources.
///
/// Implementations fail on a non-zero exit status. Output on stderr from a
/// tool that exits successfully is not an error: [`WixToolchain`] logs it at
/// warn level and continues, since WiX and signtool print advisory
/// diagnostics there.
pub trait Toolchain {
    /// Compile the sources in `request`, returning the object files produced.
    fn compile(&self, request: &BuildRequest) -> ToolchainResult<Vec<PathBuf>>;

    /// Link `objects` into `request.package_path`.
    fn link(&self, request: &BuildRequest, objects: &[PathBuf]) -> ToolchainResult<()>;

    /// Sign a finished package in place.
    fn sign(&self, package: &Path, params: &SigningParams) -> ToolchainResult<()>;
}
