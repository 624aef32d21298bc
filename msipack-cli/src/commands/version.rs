//! `version` command: show how a build version maps onto MSI versions.

use clap::Args;
use msipack::packager::package_name;
use msipack::project::DEFAULT_BUILD_ITERATION;
use msipack::version::normalize;
use serde_json::json;

use crate::error::CliError;

/// Arguments for `msipack version`.
#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Build version (e.g., 1.2.3-alpha.1+20140501194641.git.94.561b564)
    pub build_version: String,

    /// Build iteration appended as the fourth field
    #[arg(
        short = 'i',
        long,
        value_name = "N",
        default_value_t = DEFAULT_BUILD_ITERATION,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub build_iteration: u32,

    /// Project name, to also show the package filename
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Print the derived versions.
pub fn run(args: VersionArgs) -> Result<(), CliError> {
    let version = normalize(&args.build_version, args.build_iteration)?;
    let package = args
        .name
        .as_deref()
        .map(|name| package_name(name, &version.display_version, args.build_iteration));

    if args.json {
        let mut output = json!(version);
        if let Some(package) = &package {
            output["package_name"] = json!(package);
        }
        println!("{:#}", output);
        return Ok(());
    }

    println!("MSI version:     {}", version.msi_version);
    println!("Display version: {}", version.display_version);
    if let Some(package) = package {
        println!("Package:         {}", package);
    }
    Ok(())
}
