//! Arguments and helpers shared by the `render` and `build` commands.

use std::path::PathBuf;

use clap::Args;
use msipack::packager::{MsiPackager, ParameterSet};
use msipack::project::ProjectFile;
use serde_json::Value;
use tracing::debug;

use crate::error::CliError;

/// Project selection and per-build overrides.
#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project definition file (INI)
    #[arg(short, long, value_name = "FILE")]
    pub project: PathBuf,

    /// Directory the WiX sources are written to (must exist)
    #[arg(long, value_name = "DIR")]
    pub staging_dir: PathBuf,

    /// Directory the finished package is written to
    #[arg(long, value_name = "DIR", default_value = "pkg")]
    pub package_dir: PathBuf,

    /// Upgrade code, overriding [msi] upgrade_code
    #[arg(long, value_name = "GUID")]
    pub upgrade_code: Option<String>,

    /// Build version, overriding [project] build_version
    #[arg(long, value_name = "VERSION")]
    pub build_version: Option<String>,

    /// Build iteration, overriding [project] build_iteration
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub build_iteration: Option<u32>,

    /// Extra <?define ?> constants as a JSON object (e.g., '{"Key":"value"}')
    #[arg(long, value_name = "JSON")]
    pub parameters: Option<String>,
}

impl ProjectArgs {
    /// Load the project file and apply command-line overrides.
    ///
    /// Parameters from the command line are merged over those in the file.
    pub fn load_packager(&self) -> Result<MsiPackager, CliError> {
        let file = ProjectFile::load(&self.project)?;
        let mut packager =
            MsiPackager::from_project_file(file, &self.staging_dir, &self.package_dir)?;

        if let Some(code) = &self.upgrade_code {
            packager.set_upgrade_code(code.as_str())?;
        }
        if let Some(version) = &self.build_version {
            packager.project_mut().build_version = version.clone();
        }
        if let Some(iteration) = self.build_iteration {
            packager.project_mut().build_iteration = iteration;
        }
        if let Some(json) = &self.parameters {
            let overrides = parse_parameters(json)?;
            debug!(count = overrides.parameters().len(), "Applying parameter overrides");
            packager
                .parameters_mut()
                .extend(overrides.parameters().clone());
        }

        Ok(packager)
    }
}

/// Parse and validate `--parameters`.
fn parse_parameters(json: &str) -> Result<ParameterSet, CliError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CliError::InvalidArgument(format!("--parameters is not valid JSON: {}", e)))?;

    let mut set = ParameterSet::new();
    set.set_parameters_value(&value)?;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const PROJECT_INI: &str = "\
[project]
name = project
homepage = https://example.com
maintainer = Chef Software
install_dir = C:/project
build_version = 1.2.3
build_iteration = 2

[msi]
upgrade_code = FILE-CODE

[msi.parameters]
Key = from-file
Other = kept
";

    fn args(project: &Path) -> ProjectArgs {
        ProjectArgs {
            project: project.to_path_buf(),
            staging_dir: PathBuf::from("staging"),
            package_dir: PathBuf::from("pkg"),
            upgrade_code: None,
            build_version: None,
            build_iteration: None,
            parameters: None,
        }
    }

    #[test]
    fn test_load_packager_uses_file_values() {
        let temp_dir = tempdir().unwrap();
        let ini = temp_dir.path().join("project.ini");
        fs::write(&ini, PROJECT_INI).unwrap();

        let packager = args(&ini).load_packager().unwrap();
        assert_eq!(packager.upgrade_code().unwrap(), "FILE-CODE");
        assert_eq!(packager.msi_version().unwrap(), "1.2.3.2");
    }

    #[test]
    fn test_load_packager_applies_overrides() {
        let temp_dir = tempdir().unwrap();
        let ini = temp_dir.path().join("project.ini");
        fs::write(&ini, PROJECT_INI).unwrap();

        let mut args = args(&ini);
        args.upgrade_code = Some("CLI-CODE".to_string());
        args.build_version = Some("2.0.0-rc.1".to_string());
        args.build_iteration = Some(7);
        args.parameters = Some(r#"{"Key": "from-cli"}"#.to_string());

        let packager = args.load_packager().unwrap();
        assert_eq!(packager.upgrade_code().unwrap(), "CLI-CODE");
        assert_eq!(packager.msi_version().unwrap(), "2.0.0.7");
        assert_eq!(packager.parameters()["Key"], "from-cli");
        assert_eq!(packager.parameters()["Other"], "kept");
    }

    #[test]
    fn test_parameters_must_be_json_object_of_strings() {
        assert!(matches!(
            parse_parameters("not json"),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_parameters(r#"{"Port": 8080}"#),
            Err(CliError::Packager(_))
        ));
        assert!(parse_parameters(r#"{"Port": "8080"}"#).is_ok());
    }

    #[test]
    fn test_missing_project_file() {
        let temp_dir = tempdir().unwrap();
        let err = args(&temp_dir.path().join("missing.ini"))
            .load_packager()
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
