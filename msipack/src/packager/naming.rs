//! Centralized naming conventions for generated files and packages.
//!
//! All other modules should use these names rather than constructing them
//! directly, so the renderer, the toolchain and the CLI agree on paths.

/// Localization strings consumed by `light`.
pub const LOCALIZATION_FILE: &str = "localization-en-us.wxl";

/// Preprocessor constants included by the source file.
pub const PARAMETERS_FILE: &str = "parameters.wxi";

/// Main WiX source.
pub const SOURCE_FILE: &str = "source.wxs";

/// Staging subdirectory holding installer resources.
pub const RESOURCES_DIR: &str = "Resources";

/// Extension of the final package.
pub const PACKAGE_EXTENSION: &str = "msi";

/// Generate the installer filename for a build.
///
/// # Format
///
/// `{project_name}-{display_version}-{build_iteration}.msi`
///
/// # Examples
///
/// ```
/// use msipack::packager::package_name;
///
/// assert_eq!(package_name("project", "1.2.3", 2), "project-1.2.3-2.msi");
/// ```
pub fn package_name(project_name: &str, display_version: &str, build_iteration: u32) -> String {
    format!(
        "{}-{}-{}.{}",
        project_name, display_version, build_iteration, PACKAGE_EXTENSION
    )
}
