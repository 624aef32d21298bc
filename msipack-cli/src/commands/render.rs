//! `render` command: write the WiX sources without invoking the toolset.

use clap::Args;

use super::common::ProjectArgs;
use crate::error::CliError;

/// Arguments for `msipack render`.
#[derive(Debug, Args)]
pub struct RenderArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Render the localization, parameters and source files and stage resources.
pub fn run(args: RenderArgs) -> Result<(), CliError> {
    let packager = args.project.load_packager()?;

    let files = [
        packager.write_localization_file()?,
        packager.write_parameters_file()?,
        packager.write_source_file()?,
    ];
    let resources = packager.stage_resources()?;

    for file in &files {
        println!("{}", file.display());
    }
    println!(
        "Staged {} resource file(s) in {}",
        resources,
        packager.resources_dir().display()
    );
    Ok(())
}
