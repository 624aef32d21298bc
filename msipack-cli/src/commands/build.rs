//! `build` command: render the WiX sources and build the MSI.

use std::path::PathBuf;

use clap::Args;
use msipack::packager::Packager;
use msipack::toolchain::{SigningParams, WixToolchain};
use tracing::info;

use super::common::ProjectArgs;
use crate::error::CliError;

/// Arguments for `msipack build`.
#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Directory containing heat, candle and light (default: search PATH)
    #[arg(long, value_name = "DIR")]
    pub wix_bin_dir: Option<PathBuf>,

    /// signtool executable
    #[arg(long, value_name = "PATH")]
    pub signtool: Option<PathBuf>,

    /// Sign with the certificate with this SHA-1 thumbprint
    #[arg(long, value_name = "THUMBPRINT")]
    pub sign_thumbprint: Option<String>,

    /// RFC 3161 timestamp server used when signing
    #[arg(long, value_name = "URL", requires = "sign_thumbprint")]
    pub timestamp_url: Option<String>,
}

impl BuildArgs {
    fn toolchain(&self) -> WixToolchain {
        let mut toolchain = WixToolchain::new();
        if let Some(dir) = &self.wix_bin_dir {
            toolchain = toolchain.with_bin_dir(dir);
        }
        if let Some(signtool) = &self.signtool {
            toolchain = toolchain.with_signtool(signtool);
        }
        toolchain
    }

    fn signing(&self) -> Option<SigningParams> {
        let thumbprint = self.sign_thumbprint.as_ref()?;
        let mut params = SigningParams::new(thumbprint.as_str());
        if let Some(url) = &self.timestamp_url {
            params = params.with_timestamp_url(url.as_str());
        }
        Some(params)
    }
}

/// Build the package.
pub fn run(args: BuildArgs) -> Result<(), CliError> {
    let mut packager = args.project.load_packager()?;
    if let Some(params) = args.signing() {
        packager = packager.with_signing(params);
    }

    let toolchain = args.toolchain();
    toolchain.check_required_tools()?;

    info!(package = %packager.package_name()?, "Building package");
    let msi = packager.package(&toolchain)?;
    println!("{}", msi.display());
    Ok(())
}
