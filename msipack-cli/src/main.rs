//! msipack CLI - Command-line interface
//!
//! This binary renders WiX sources for a project and drives the WiX toolset
//! to build the MSI.

mod commands;
mod error;

use std::error::Error;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::build::BuildArgs;
use commands::render::RenderArgs;
use commands::version::VersionArgs;

/// Build Windows Installer packages from a staged application tree.
#[derive(Debug, Parser)]
#[command(name = "msipack", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the WiX sources into the staging directory
    Render(RenderArgs),

    /// Write the WiX sources and build the MSI with the WiX toolset
    Build(BuildArgs),

    /// Show the MSI versions derived from a build version
    Version(VersionArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Build(args) => commands::build::run(args),
        Commands::Version(args) => commands::version::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_build_with_overrides() {
        let cli = Cli::try_parse_from([
            "msipack",
            "build",
            "--project",
            "project.ini",
            "--staging-dir",
            "staging",
            "--build-iteration",
            "3",
            "--parameters",
            r#"{"Key":"value"}"#,
            "--wix-bin-dir",
            "C:/wix/bin",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };
        assert_eq!(args.project.project, PathBuf::from("project.ini"));
        assert_eq!(args.project.package_dir, PathBuf::from("pkg"));
        assert_eq!(args.project.build_iteration, Some(3));
        assert_eq!(args.project.parameters.as_deref(), Some(r#"{"Key":"value"}"#));
        assert_eq!(args.wix_bin_dir, Some(PathBuf::from("C:/wix/bin")));
    }

    #[test]
    fn test_render_requires_staging_dir() {
        let result = Cli::try_parse_from(["msipack", "render", "--project", "project.ini"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_iteration_must_be_positive() {
        let result = Cli::try_parse_from([
            "msipack",
            "render",
            "--project",
            "project.ini",
            "--staging-dir",
            "staging",
            "--build-iteration",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_url_requires_thumbprint() {
        let result = Cli::try_parse_from([
            "msipack",
            "build",
            "--project",
            "project.ini",
            "--staging-dir",
            "staging",
            "--timestamp-url",
            "http://timestamp.digicert.com",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_version_defaults() {
        let cli = Cli::try_parse_from(["msipack", "version", "1.2.3-rc.1"]).unwrap();
        let Commands::Version(args) = cli.command else {
            panic!("expected version command");
        };
        assert_eq!(args.build_version, "1.2.3-rc.1");
        assert_eq!(args.build_iteration, 1);
        assert!(!args.json);
    }
}
