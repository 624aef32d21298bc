//! MSI packager for staged application trees.
//!
//! The packager writes three WiX files into a staging directory and hands
//! them to a [`Toolchain`] that compiles and links the final `.msi`:
//!
//! - `localization-en-us.wxl` - product, manufacturer and feature names
//! - `parameters.wxi` - version numbers, upgrade code and custom constants
//! - `source.wxs` - product definition and install directory layout
//!
//! # Example
//!
//! ```ignore
//! use msipack::packager::MsiPackager;
//! use msipack::project::Project;
//! use msipack::toolchain::WixToolchain;
//!
//! let project = Project::new("project")
//!     .with_maintainer("Chef Software")
//!     .with_install_dir("C:/project")
//!     .with_build_version("1.2.3")
//!     .with_build_iteration(2);
//!
//! let mut packager = MsiPackager::new(project, "C:/staging", "C:/pkg");
//! packager.set_upgrade_code("2CD7259C-776D-4DFF-BE5F-F8B0C1AF1E4C")?;
//!
//! let msi = packager.package(&WixToolchain::new())?;
//! println!("Built {}", msi.display());
//! ```
//!
//! Derived values (versions, package name) are recomputed on every call, so
//! changes to the project or settings are always reflected. A packager is not
//! safe to run concurrently against the same staging directory: every render
//! fully overwrites its file.

mod error;
mod naming;
mod parameters;
mod render;

pub use error::{PackagerError, PackagerResult};
pub use naming::{
    package_name, LOCALIZATION_FILE, PACKAGE_EXTENSION, PARAMETERS_FILE, RESOURCES_DIR,
    SOURCE_FILE,
};
pub use parameters::{ParameterSet, Parameters, RequiredAttribute, RESERVED_PARAMETERS};
pub use render::{
    localization_document, parameters_document, source_document, write_file,
    LOCALIZATION_CODEPAGE,
};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::project::{Project, ProjectFile};
use crate::toolchain::{BuildRequest, SigningParams, Toolchain};
use crate::version::{normalize, NormalizedVersion};

/// A packager that produces one kind of installer from a project.
pub trait Packager {
    /// Short identifier of the package format.
    fn id(&self) -> &'static str;

    /// Filename of the package this packager produces.
    fn package_name(&self) -> PackagerResult<String>;

    /// Directory the package is written to.
    fn package_dir(&self) -> &Path;

    /// Full path of the package.
    fn package_path(&self) -> PackagerResult<PathBuf> {
        Ok(self.package_dir().join(self.package_name()?))
    }
}

/// Builds a Windows Installer package with the WiX toolset.
#[derive(Debug, Clone)]
pub struct MsiPackager {
    project: Project,
    staging_dir: PathBuf,
    package_dir: PathBuf,
    settings: ParameterSet,
    signing: Option<SigningParams>,
}

impl MsiPackager {
    /// Create a packager for `project`.
    ///
    /// `staging_dir` must exist and be writable; `package_dir` is created when
    /// the package is built.
    pub fn new(
        project: Project,
        staging_dir: impl Into<PathBuf>,
        package_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            project,
            staging_dir: staging_dir.into(),
            package_dir: package_dir.into(),
            settings: ParameterSet::new(),
            signing: None,
        }
    }

    /// Create a packager from a loaded project definition.
    ///
    /// The file's upgrade code and parameters go through the same validation
    /// as the setters.
    pub fn from_project_file(
        file: ProjectFile,
        staging_dir: impl Into<PathBuf>,
        package_dir: impl Into<PathBuf>,
    ) -> PackagerResult<Self> {
        let mut packager = Self::new(file.project, staging_dir, package_dir);
        if let Some(code) = file.upgrade_code {
            packager.set_upgrade_code(code)?;
        }
        packager.set_parameters(file.parameters)?;
        packager.signing = file.signing;
        Ok(packager)
    }

    /// Sign the package after linking.
    pub fn with_signing(mut self, params: SigningParams) -> Self {
        self.signing = Some(params);
        self
    }

    /// The project being packaged.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mutable access to the project, e.g. to bump the build iteration.
    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    /// The MSI-specific settings.
    pub fn settings(&self) -> &ParameterSet {
        &self.settings
    }

    /// Signing settings, if the package will be signed.
    pub fn signing(&self) -> Option<&SigningParams> {
        self.signing.as_ref()
    }

    /// See [`ParameterSet::upgrade_code`].
    pub fn upgrade_code(&self) -> PackagerResult<&str> {
        self.settings.upgrade_code()
    }

    /// See [`ParameterSet::set_upgrade_code`].
    pub fn set_upgrade_code(&mut self, code: impl Into<String>) -> PackagerResult<()> {
        self.settings.set_upgrade_code(code)
    }

    /// See [`ParameterSet::set_upgrade_code_value`].
    pub fn set_upgrade_code_value(&mut self, value: &Value) -> PackagerResult<()> {
        self.settings.set_upgrade_code_value(value)
    }

    /// See [`ParameterSet::parameters`].
    pub fn parameters(&self) -> &Parameters {
        self.settings.parameters()
    }

    /// See [`ParameterSet::parameters_mut`].
    pub fn parameters_mut(&mut self) -> &mut Parameters {
        self.settings.parameters_mut()
    }

    /// See [`ParameterSet::set_parameters`].
    pub fn set_parameters(&mut self, parameters: Parameters) -> PackagerResult<()> {
        self.settings.set_parameters(parameters)
    }

    /// See [`ParameterSet::set_parameters_value`].
    pub fn set_parameters_value(&mut self, value: &Value) -> PackagerResult<()> {
        self.settings.set_parameters_value(value)
    }

    /// Staging directory the WiX files are written to.
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// `{staging_dir}/Resources`
    pub fn resources_dir(&self) -> PathBuf {
        self.staging_dir.join(RESOURCES_DIR)
    }

    /// Both derived versions for the current build version and iteration.
    pub fn version(&self) -> PackagerResult<NormalizedVersion> {
        Ok(normalize(
            &self.project.build_version,
            self.project.build_iteration,
        )?)
    }

    /// Four-field version, e.g. `1.2.3.2`.
    pub fn msi_version(&self) -> PackagerResult<String> {
        Ok(self.version()?.msi_version)
    }

    /// Three-field version shown to users, e.g. `1.2.3`.
    pub fn msi_display_version(&self) -> PackagerResult<String> {
        Ok(self.version()?.display_version)
    }

    /// Write `localization-en-us.wxl` into the staging directory.
    pub fn write_localization_file(&self) -> PackagerResult<PathBuf> {
        let path = self.staging_dir.join(LOCALIZATION_FILE);
        write_file(&path, &localization_document(&self.project)?)?;
        info!(path = %path.display(), "Wrote localization file");
        Ok(path)
    }

    /// Write `parameters.wxi` into the staging directory.
    ///
    /// # Errors
    ///
    /// Fails with [`PackagerError::MissingRequiredAttribute`] if no upgrade
    /// code is set, and with [`PackagerError::InvalidVersionFormat`] if the
    /// build version has no usable prefix. The file is untouched in both cases.
    pub fn write_parameters_file(&self) -> PackagerResult<PathBuf> {
        let upgrade_code = self.settings.upgrade_code()?;
        let version = self.version()?;
        parameters::validate_parameters(self.settings.parameters())?;

        let path = self.staging_dir.join(PARAMETERS_FILE);
        let contents = parameters_document(&version, upgrade_code, self.settings.parameters())?;
        write_file(&path, &contents)?;
        info!(
            path = %path.display(),
            version = %version.msi_version,
            parameters = self.settings.parameters().len(),
            "Wrote parameters file"
        );
        Ok(path)
    }

    /// Write `source.wxs` into the staging directory.
    pub fn write_source_file(&self) -> PackagerResult<PathBuf> {
        let path = self.staging_dir.join(SOURCE_FILE);
        write_file(&path, &source_document(&self.project)?)?;
        info!(path = %path.display(), "Wrote source file");
        Ok(path)
    }

    /// Copy the project's resource files into [`Self::resources_dir`].
    ///
    /// The resources directory is created even when the project has none.
    /// Only regular files at the top level are copied. Returns the number of
    /// files copied.
    pub fn stage_resources(&self) -> PackagerResult<usize> {
        let target = self.resources_dir();
        fs::create_dir_all(&target).map_err(|e| PackagerError::CreateDirectoryFailed {
            path: target.clone(),
            source: e,
        })?;

        let Some(source) = &self.project.resources_path else {
            debug!("No resources configured");
            return Ok(0);
        };

        let entries = fs::read_dir(source).map_err(|e| PackagerError::ReadFailed {
            path: source.clone(),
            source: e,
        })?;

        let mut copied = 0;
        for entry in entries {
            let entry = entry.map_err(|e| PackagerError::ReadFailed {
                path: source.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                warn!(path = %path.display(), "Skipping non-file resource");
                continue;
            }

            let destination = target.join(entry.file_name());
            fs::copy(&path, &destination).map_err(|e| PackagerError::WriteFailed {
                path: destination.clone(),
                source: e,
            })?;
            copied += 1;
        }

        info!(count = copied, dir = %target.display(), "Staged resources");
        Ok(copied)
    }

    /// Render all files and build the package with `toolchain`.
    ///
    /// Steps run in order and stop at the first failure; files written by
    /// earlier steps stay on disk. Returns the path of the finished package.
    pub fn package(&self, toolchain: &dyn Toolchain) -> PackagerResult<PathBuf> {
        let localization_file = self.write_localization_file()?;
        let parameters_file = self.write_parameters_file()?;
        let source_file = self.write_source_file()?;
        self.stage_resources()?;

        fs::create_dir_all(&self.package_dir).map_err(|e| {
            PackagerError::CreateDirectoryFailed {
                path: self.package_dir.clone(),
                source: e,
            }
        })?;

        let request = BuildRequest {
            staging_dir: self.staging_dir.clone(),
            install_dir: self.project.install_dir.clone(),
            localization_file,
            parameters_file,
            source_file,
            resources_dir: self.resources_dir(),
            upgrade_code: self.settings.upgrade_code()?.to_string(),
            package_path: self.package_path()?,
            signing: self.signing.clone(),
        };

        let objects = toolchain.compile(&request)?;
        toolchain.link(&request, &objects)?;
        if let Some(signing) = &request.signing {
            toolchain.sign(&request.package_path, signing)?;
        }

        info!(package = %request.package_path.display(), "Built MSI package");
        Ok(request.package_path)
    }
}

impl Packager for MsiPackager {
    fn id(&self) -> &'static str {
        "msi"
    }

    fn package_name(&self) -> PackagerResult<String> {
        Ok(package_name(
            &self.project.name,
            &self.msi_display_version()?,
            self.project.build_iteration,
        ))
    }

    fn package_dir(&self) -> &Path {
        &self.package_dir
    }
}
