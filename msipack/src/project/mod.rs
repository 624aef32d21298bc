//! Project metadata consumed by the packager.
//!
//! A [`Project`] describes the application being packaged: its name, who
//! maintains it, where it installs to, and which build is being packaged.
//! Projects are either built in code or loaded from an INI definition file
//! (see [`Project::load`]).

mod config;

pub use config::{ConfigError, ConfigResult, ProjectFile, MSI_PARAMETERS_SECTION, MSI_SECTION};

use std::path::{Path, PathBuf};

/// Default packaging revision when none is configured.
pub const DEFAULT_BUILD_ITERATION: u32 = 1;

/// Metadata for the application being packaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Machine name of the project (e.g., `chef`). Used in file and directory names.
    pub name: String,

    /// Human-readable name. Defaults to the capitalized project name.
    pub friendly_name: Option<String>,

    /// Project homepage URL.
    pub homepage: String,

    /// Maintainer, shown as the manufacturer of the installed product.
    pub maintainer: String,

    /// Directory the staged application tree lives in.
    pub install_dir: PathBuf,

    /// Upstream build version (semver, semver with metadata, or git-describe).
    pub build_version: String,

    /// Packaging revision, independent of the build version.
    pub build_iteration: u32,

    /// Optional directory of installer resources (banners, icons, license).
    pub resources_path: Option<PathBuf>,
}

impl Project {
    /// Create a project with the given name and empty metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            friendly_name: None,
            homepage: String::new(),
            maintainer: String::new(),
            install_dir: PathBuf::new(),
            build_version: String::new(),
            build_iteration: DEFAULT_BUILD_ITERATION,
            resources_path: None,
        }
    }

    /// Load a project definition from an INI file.
    ///
    /// This only reads the `[project]` section; use [`ProjectFile::load`] to
    /// also get the `[msi]` settings.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        Ok(ProjectFile::load(path)?.project)
    }

    /// Set the human-readable name.
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Set the homepage.
    pub fn with_homepage(mut self, homepage: impl Into<String>) -> Self {
        self.homepage = homepage.into();
        self
    }

    /// Set the maintainer.
    pub fn with_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        self.maintainer = maintainer.into();
        self
    }

    /// Set the install directory.
    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = install_dir.into();
        self
    }

    /// Set the build version.
    pub fn with_build_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = version.into();
        self
    }

    /// Set the build iteration.
    pub fn with_build_iteration(mut self, iteration: u32) -> Self {
        self.build_iteration = iteration;
        self
    }

    /// Set the resources directory.
    pub fn with_resources_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resources_path = Some(path.into());
        self
    }

    /// The name shown to users in the installer UI.
    ///
    /// Uses the friendly name when set, otherwise the project name with its
    /// first letter upper-cased and the rest lower-cased.
    pub fn display_name(&self) -> String {
        match &self.friendly_name {
            Some(name) => name.clone(),
            None => capitalize(&self.name),
        }
    }
}

/// Upper-case the first character and lower-case the rest.
///
/// ```
/// use msipack::project::capitalize;
///
/// assert_eq!(capitalize("project"), "Project");
/// assert_eq!(capitalize("chefDK"), "Chefdk");
/// assert_eq!(capitalize(""), "");
/// ```
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        let project = Project::new("project")
            .with_homepage("https://example.com")
            .with_maintainer("Chef Software")
            .with_install_dir("C:/project")
            .with_build_version("1.2.3")
            .with_build_iteration(2);

        assert_eq!(project.name, "project");
        assert_eq!(project.homepage, "https://example.com");
        assert_eq!(project.maintainer, "Chef Software");
        assert_eq!(project.install_dir, PathBuf::from("C:/project"));
        assert_eq!(project.build_version, "1.2.3");
        assert_eq!(project.build_iteration, 2);
        assert!(project.resources_path.is_none());
    }

    #[test]
    fn test_default_build_iteration() {
        assert_eq!(Project::new("x").build_iteration, DEFAULT_BUILD_ITERATION);
    }

    #[test]
    fn test_display_name_capitalizes() {
        assert_eq!(Project::new("project").display_name(), "Project");
        assert_eq!(Project::new("PROJECT").display_name(), "Project");
    }

    #[test]
    fn test_display_name_prefers_friendly_name() {
        let project = Project::new("chef-dk").with_friendly_name("Chef Development Kit");
        assert_eq!(project.display_name(), "Chef Development Kit");
    }

    #[test]
    fn test_capitalize_non_ascii() {
        assert_eq!(capitalize("élan"), "Élan");
    }
}
