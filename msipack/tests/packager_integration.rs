//! Integration tests for the MSI packager.
//!
//! These tests verify the complete packaging flow including:
//! - Project definition file → packager settings
//! - Rendering of localization, parameters and source files
//! - Toolchain invocation order and failure propagation
//!
//! Run with: `cargo test --test packager_integration`

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

use msipack::packager::{MsiPackager, Packager, PackagerError};
use msipack::project::ProjectFile;
use msipack::toolchain::{BuildRequest, SigningParams, Toolchain, ToolchainError, ToolchainResult};

// ============================================================================
// Helper Functions
// ============================================================================

const PROJECT_INI: &str = r#"
[project]
name = project
homepage = https://example.com
maintainer = Chef Software
install_dir = C:/project
build_version = 1.2.3+20140501194641.git.94.561b564
build_iteration = 2
resources_dir = resources

[msi]
upgrade_code = 2CD7259C-776D-4DFF-BE5F-F8B0C1AF1E4C

[msi.parameters]
StartMenuFolder = Project Tools
"#;

/// Toolchain step recorded by [`RecordingToolchain`].
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Compile,
    Link(Vec<PathBuf>),
    Sign(PathBuf, String),
}

/// Fake toolchain that records calls and optionally fails at one step.
#[derive(Default)]
struct RecordingToolchain {
    steps: RefCell<Vec<Step>>,
    requests: RefCell<Vec<BuildRequest>>,
    fail_link: bool,
}

impl RecordingToolchain {
    fn failing_link() -> Self {
        Self {
            fail_link: true,
            ..Self::default()
        }
    }

    fn steps(&self) -> Vec<Step> {
        self.steps.borrow().clone()
    }
}

impl Toolchain for RecordingToolchain {
    fn compile(&self, request: &BuildRequest) -> ToolchainResult<Vec<PathBuf>> {
        self.steps.borrow_mut().push(Step::Compile);
        self.requests.borrow_mut().push(request.clone());
        Ok(vec![request.staging_dir.join("source.wixobj")])
    }

    fn link(&self, request: &BuildRequest, objects: &[PathBuf]) -> ToolchainResult<()> {
        self.steps.borrow_mut().push(Step::Link(objects.to_vec()));
        if self.fail_link {
            return Err(ToolchainError::Failed {
                tool: "light".to_string(),
                status: Some(1),
                stdout: "error LGHT0204 : ICE03: Invalid string length".to_string(),
                stderr: String::new(),
            });
        }
        fs::write(&request.package_path, b"MSI").map_err(|source| ToolchainError::NotFound {
            tool: "light".to_string(),
            source,
        })
    }

    fn sign(&self, package: &Path, params: &SigningParams) -> ToolchainResult<()> {
        self.steps
            .borrow_mut()
            .push(Step::Sign(package.to_path_buf(), params.thumbprint.clone()));
        Ok(())
    }
}

/// Write the project definition and resources into a fresh workspace.
fn setup() -> (TempDir, MsiPackager) {
    let temp_dir = tempdir().unwrap();
    let root = temp_dir.path();

    let ini_path = root.join("project.ini");
    fs::write(&ini_path, PROJECT_INI).unwrap();
    fs::create_dir_all(root.join("resources")).unwrap();
    fs::write(root.join("resources").join("license.rtf"), "{\\rtf1 MIT}").unwrap();
    fs::create_dir_all(root.join("staging")).unwrap();

    let file = ProjectFile::load(&ini_path).unwrap();
    let packager =
        MsiPackager::from_project_file(file, root.join("staging"), root.join("pkg")).unwrap();
    (temp_dir, packager)
}

// ============================================================================
// Integration Tests
// ============================================================================

#[test]
fn test_project_file_configures_packager() {
    let (_temp_dir, packager) = setup();

    assert_eq!(
        packager.upgrade_code().unwrap(),
        "2CD7259C-776D-4DFF-BE5F-F8B0C1AF1E4C"
    );
    assert_eq!(packager.parameters()["StartMenuFolder"], "Project Tools");
    assert_eq!(packager.msi_version().unwrap(), "1.2.3.2");
    assert_eq!(packager.msi_display_version().unwrap(), "1.2.3");
    assert_eq!(packager.package_name().unwrap(), "project-1.2.3-2.msi");
}

#[test]
fn test_package_renders_files_and_runs_toolchain() {
    let (temp_dir, packager) = setup();
    let toolchain = RecordingToolchain::default();

    let msi = packager.package(&toolchain).unwrap();

    let staging = temp_dir.path().join("staging");
    assert_eq!(msi, temp_dir.path().join("pkg").join("project-1.2.3-2.msi"));
    assert!(msi.is_file());
    assert!(staging.join("localization-en-us.wxl").is_file());
    assert!(staging.join("parameters.wxi").is_file());
    assert!(staging.join("source.wxs").is_file());
    assert!(staging.join("Resources").join("license.rtf").is_file());

    let parameters = fs::read_to_string(staging.join("parameters.wxi")).unwrap();
    assert!(parameters.contains(r#"<?define StartMenuFolder="Project Tools" ?>"#));

    assert_eq!(
        toolchain.steps(),
        vec![
            Step::Compile,
            Step::Link(vec![staging.join("source.wixobj")]),
        ]
    );

    let requests = toolchain.requests.borrow();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].install_dir, PathBuf::from("C:/project"));
    assert_eq!(requests[0].resources_dir, staging.join("Resources"));
    assert_eq!(
        requests[0].upgrade_code,
        "2CD7259C-776D-4DFF-BE5F-F8B0C1AF1E4C"
    );
}

#[test]
fn test_package_signs_when_configured() {
    let (_temp_dir, packager) = setup();
    let packager = packager.with_signing(SigningParams::new("0123ABCD"));
    let toolchain = RecordingToolchain::default();

    let msi = packager.package(&toolchain).unwrap();

    assert_eq!(
        toolchain.steps().last(),
        Some(&Step::Sign(msi, "0123ABCD".to_string()))
    );
}

#[test]
fn test_package_propagates_toolchain_failure() {
    let (temp_dir, packager) = setup();
    let toolchain = RecordingToolchain::failing_link();

    let err = packager.package(&toolchain).unwrap_err();

    assert!(matches!(err, PackagerError::Toolchain(_)));
    assert!(err.to_string().contains("ICE03"));
    assert!(!temp_dir
        .path()
        .join("pkg")
        .join("project-1.2.3-2.msi")
        .exists());
    // Rendered files remain for inspection
    assert!(temp_dir.path().join("staging").join("source.wxs").is_file());
}

#[test]
fn test_package_without_upgrade_code_runs_no_tools() {
    let temp_dir = tempdir().unwrap();
    let staging = temp_dir.path().join("staging");
    fs::create_dir_all(&staging).unwrap();

    let file = ProjectFile::parse(
        "[project]\nname = project\nhomepage = https://example.com\n\
         maintainer = Chef Software\ninstall_dir = C:/project\nbuild_version = 1.2.3\n",
        temp_dir.path(),
    )
    .unwrap();
    let packager =
        MsiPackager::from_project_file(file, &staging, temp_dir.path().join("pkg")).unwrap();
    let toolchain = RecordingToolchain::default();

    let err = packager.package(&toolchain).unwrap_err();

    assert!(matches!(err, PackagerError::MissingRequiredAttribute { .. }));
    assert!(toolchain.steps().is_empty());
    assert!(!staging.join("parameters.wxi").exists());
}

#[test]
fn test_rebuild_after_iteration_bump() {
    let (temp_dir, mut packager) = setup();
    let toolchain = RecordingToolchain::default();

    packager.package(&toolchain).unwrap();
    packager.project_mut().build_iteration = 3;
    let msi = packager.package(&toolchain).unwrap();

    assert_eq!(msi, temp_dir.path().join("pkg").join("project-1.2.3-3.msi"));
    let parameters =
        fs::read_to_string(temp_dir.path().join("staging").join("parameters.wxi")).unwrap();
    assert!(parameters.contains(r#"<?define VersionNumber="1.2.3.3" ?>"#));
}
