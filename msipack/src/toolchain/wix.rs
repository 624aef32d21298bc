//! WiX v3 toolset driver.
//!
//! Uses the external `heat`, `candle` and `light` binaries, and `signtool`
//! when a package must be signed.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, info, warn};

use super::{BuildRequest, SigningParams, Toolchain, ToolchainError, ToolchainResult};

/// File produced by harvesting the staged tree.
pub const HARVEST_FILE: &str = "project-files.wxs";

/// Component group the harvested files are placed in.
pub const HARVEST_COMPONENT_GROUP: &str = "ProjectDir";

/// Directory the harvested files are installed under.
const HARVEST_DIRECTORY_REF: &str = "PROJECTLOCATION";

/// Preprocessor variable pointing at the staged tree.
const SOURCE_DIR_VARIABLE: &str = "ProjectSourceDir";

/// Driver for the WiX toolset binaries.
#[derive(Debug, Clone)]
pub struct WixToolchain {
    bin_dir: Option<PathBuf>,
    signtool: PathBuf,
    extensions: Vec<String>,
    culture: String,
}

impl Default for WixToolchain {
    fn default() -> Self {
        Self {
            bin_dir: None,
            signtool: PathBuf::from("signtool"),
            extensions: vec!["WixUIExtension".to_string()],
            culture: "en-us".to_string(),
        }
    }
}

impl WixToolchain {
    /// Use the WiX binaries found on `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the WiX binaries in `dir` (e.g., `C:\Program Files (x86)\WiX Toolset v3.11\bin`).
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    /// Use a specific `signtool` executable.
    pub fn with_signtool(mut self, path: impl Into<PathBuf>) -> Self {
        self.signtool = path.into();
        self
    }

    /// Add a WiX extension passed to `light`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        if !self.extensions.contains(&extension) {
            self.extensions.push(extension);
        }
        self
    }

    /// Check that `heat`, `candle` and `light` can be started.
    pub fn check_required_tools(&self) -> ToolchainResult<()> {
        for tool in ["heat", "candle", "light"] {
            self.check_tool_available(tool)?;
        }
        Ok(())
    }

    fn check_tool_available(&self, tool: &str) -> ToolchainResult<()> {
        let program = self.program(tool);
        // `-?` prints usage and exits 0 for every WiX v3 tool.
        let output = Command::new(&program)
            .arg("-?")
            .output()
            .map_err(|source| ToolchainError::NotFound {
                tool: tool.to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(failure(tool, &output))
        }
    }

    fn program(&self, tool: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Arguments for harvesting `install_dir` into [`HARVEST_FILE`].
    pub fn heat_args(&self, request: &BuildRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["dir".into(), windows_path(&request.install_dir).into()];
        args.extend(
            [
                "-nologo",
                "-srd",
                "-gg",
                "-cg",
                HARVEST_COMPONENT_GROUP,
                "-dr",
                HARVEST_DIRECTORY_REF,
                "-var",
            ]
            .map(OsString::from),
        );
        args.push(format!("var.{}", SOURCE_DIR_VARIABLE).into());
        args.push("-out".into());
        args.push(HARVEST_FILE.into());
        args
    }

    /// Arguments for compiling the harvested and generated sources.
    pub fn candle_args(&self, request: &BuildRequest) -> Vec<OsString> {
        let source = request
            .source_file
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| request.source_file.clone().into_os_string());

        let mut args: Vec<OsString> = vec![
            "-nologo".into(),
            "-out".into(),
            // A trailing separator tells candle the output is a directory.
            format!("{}\\", windows_path(&request.staging_dir)).into(),
            format!(
                "-d{}={}",
                SOURCE_DIR_VARIABLE,
                windows_path(&request.install_dir)
            )
            .into(),
        ];
        if let Some(dir) = request
            .parameters_file
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            args.push(format!("-I{}", windows_path(dir)).into());
        }
        args.push(HARVEST_FILE.into());
        args.push(source);
        args
    }

    /// Arguments for linking `objects` into the final package.
    pub fn light_args(&self, request: &BuildRequest, objects: &[PathBuf]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-nologo".into()];
        for extension in &self.extensions {
            args.push("-ext".into());
            args.push(extension.into());
        }
        args.push(format!("-cultures:{}", self.culture).into());
        args.push("-loc".into());
        args.push(windows_path(&request.localization_file).into());
        args.push("-b".into());
        args.push(windows_path(&request.resources_dir).into());
        args.extend(objects.iter().map(|o| OsString::from(windows_path(o))));
        args.push("-out".into());
        args.push(windows_path(&request.package_path).into());
        args
    }

    /// Arguments for signing `package`.
    pub fn signtool_args(&self, package: &Path, params: &SigningParams) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["sign", "/sm", "/sha1"].map(OsString::from).into();
        args.push(params.thumbprint.as_str().into());
        args.push("/fd".into());
        args.push("SHA256".into());
        if let Some(url) = &params.timestamp_url {
            args.extend(["/tr", url.as_str(), "/td", "SHA256"].map(OsString::from));
        }
        args.push(windows_path(package).into());
        args
    }

    fn run(&self, tool: &str, args: &[OsString], cwd: &Path) -> ToolchainResult<Output> {
        self.run_program(tool, &self.program(tool), args, cwd)
    }

    fn run_program(
        &self,
        tool: &str,
        program: &Path,
        args: &[OsString],
        cwd: &Path,
    ) -> ToolchainResult<Output> {
        debug!(tool, ?args, cwd = %cwd.display(), "Running tool");

        let output = Command::new(program)
            .current_dir(cwd)
            .args(args)
            .output()
            .map_err(|source| ToolchainError::NotFound {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(failure(tool, &output));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(tool, stderr = %stderr.trim(), "Tool succeeded with diagnostics");
        }

        Ok(output)
    }
}

impl Toolchain for WixToolchain {
    fn compile(&self, request: &BuildRequest) -> ToolchainResult<Vec<PathBuf>> {
        info!(install_dir = %request.install_dir.display(), "Harvesting staged files");
        self.run("heat", &self.heat_args(request), &request.staging_dir)?;

        info!("Compiling WiX sources");
        self.run("candle", &self.candle_args(request), &request.staging_dir)?;

        let objects = [Path::new(HARVEST_FILE), request.source_file.as_path()]
            .iter()
            .filter_map(|source| source.file_name())
            .map(|name| request.staging_dir.join(name).with_extension("wixobj"))
            .collect();
        Ok(objects)
    }

    fn link(&self, request: &BuildRequest, objects: &[PathBuf]) -> ToolchainResult<()> {
        info!(package = %request.package_path.display(), "Linking package");
        self.run(
            "light",
            &self.light_args(request, objects),
            &request.staging_dir,
        )?;
        Ok(())
    }

    fn sign(&self, package: &Path, params: &SigningParams) -> ToolchainResult<()> {
        info!(package = %package.display(), "Signing package");
        let cwd = package.parent().unwrap_or_else(|| Path::new("."));
        self.run_program(
            "signtool",
            &self.signtool,
            &self.signtool_args(package, params),
            cwd,
        )?;
        Ok(())
    }
}

fn failure(tool: &str, output: &Output) -> ToolchainError {
    ToolchainError::Failed {
        tool: tool.to_string(),
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Render a path with Windows separators, as the WiX tools expect.
///
/// ```
/// use std::path::Path;
/// use msipack::toolchain::windows_path;
///
/// assert_eq!(windows_path(Path::new("C:/opt/project")), r"C:\opt\project");
/// ```
pub fn windows_path(path: &Path) -> String {
    path.to_string_lossy().replace('/', "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BuildRequest {
        BuildRequest {
            staging_dir: PathBuf::from("C:/staging"),
            install_dir: PathBuf::from("C:/project"),
            localization_file: PathBuf::from("C:/staging/localization-en-us.wxl"),
            parameters_file: PathBuf::from("C:/staging/parameters.wxi"),
            source_file: PathBuf::from("C:/staging/source.wxs"),
            resources_dir: PathBuf::from("C:/staging/Resources"),
            upgrade_code: "ABCD-1234".to_string(),
            package_path: PathBuf::from("C:/pkg/project-1.2.3-2.msi"),
            signing: None,
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_heat_args() {
        let args = strings(WixToolchain::new().heat_args(&request()));
        assert_eq!(&args[..2], ["dir", r"C:\project"]);
        assert!(args.windows(2).any(|w| w == ["-cg", "ProjectDir"]));
        assert!(args.windows(2).any(|w| w == ["-dr", "PROJECTLOCATION"]));
        assert!(args.windows(2).any(|w| w == ["-var", "var.ProjectSourceDir"]));
        assert!(args.ends_with(&["-out".to_string(), "project-files.wxs".to_string()]));
    }

    #[test]
    fn test_candle_args() {
        let args = strings(WixToolchain::new().candle_args(&request()));
        assert_eq!(
            args,
            [
                "-nologo",
                "-out",
                r"C:\staging\",
                r"-dProjectSourceDir=C:\project",
                r"-IC:\staging",
                "project-files.wxs",
                "source.wxs",
            ]
        );
    }

    #[test]
    fn test_candle_args_without_include_dir() {
        let mut request = request();
        request.parameters_file = PathBuf::from("parameters.wxi");
        let args = strings(WixToolchain::new().candle_args(&request));
        assert!(!args.iter().any(|a| a.starts_with("-I")));
    }

    #[test]
    fn test_light_args() {
        let objects = vec![
            PathBuf::from("C:/staging/project-files.wixobj"),
            PathBuf::from("C:/staging/source.wixobj"),
        ];
        let args = strings(WixToolchain::new().light_args(&request(), &objects));
        assert!(args.windows(2).any(|w| w == ["-ext", "WixUIExtension"]));
        assert!(args.contains(&"-cultures:en-us".to_string()));
        assert!(args
            .windows(2)
            .any(|w| w == ["-loc", r"C:\staging\localization-en-us.wxl"]));
        assert!(args.windows(2).any(|w| w == ["-b", r"C:\staging\Resources"]));
        assert!(args.contains(&r"C:\staging\source.wixobj".to_string()));
        assert!(args.ends_with(&["-out".to_string(), r"C:\pkg\project-1.2.3-2.msi".to_string()]));
    }

    #[test]
    fn test_extensions_are_deduplicated() {
        let toolchain = WixToolchain::new()
            .with_extension("WixUIExtension")
            .with_extension("WixUtilExtension");
        let args = strings(toolchain.light_args(&request(), &[]));
        assert_eq!(args.iter().filter(|a| *a == "-ext").count(), 2);
    }

    #[test]
    fn test_signtool_args() {
        let params = SigningParams::new("0123ABCD").with_timestamp_url("http://ts.example.com");
        let args = strings(
            WixToolchain::new().signtool_args(Path::new("C:/pkg/project.msi"), &params),
        );
        assert_eq!(
            args,
            [
                "sign",
                "/sm",
                "/sha1",
                "0123ABCD",
                "/fd",
                "SHA256",
                "/tr",
                "http://ts.example.com",
                "/td",
                "SHA256",
                r"C:\pkg\project.msi",
            ]
        );
    }

    #[test]
    fn test_program_uses_bin_dir() {
        let toolchain = WixToolchain::new().with_bin_dir("/opt/wix/bin");
        assert_eq!(toolchain.program("candle"), PathBuf::from("/opt/wix/bin/candle"));
        assert_eq!(WixToolchain::new().program("light"), PathBuf::from("light"));
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_on_success_is_not_fatal() {
        let toolchain = WixToolchain::new();
        let args: Vec<OsString> = vec!["-c".into(), "echo 'warning LGHT1076 : ICE61' >&2".into()];
        let output = toolchain
            .run_program("light", Path::new("sh"), &args, Path::new("."))
            .unwrap();
        assert!(output.status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_fatal() {
        let toolchain = WixToolchain::new();
        let args: Vec<OsString> = vec!["-c".into(), "echo 'error CNDL0104' >&2; exit 3".into()];
        let err = toolchain
            .run_program("candle", Path::new("sh"), &args, Path::new("."))
            .unwrap_err();
        match err {
            ToolchainError::Failed { tool, status, stderr, .. } => {
                assert_eq!(tool, "candle");
                assert_eq!(status, Some(3));
                assert!(stderr.contains("CNDL0104"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_tool_is_not_found() {
        let toolchain = WixToolchain::new().with_bin_dir("/nonexistent/msipack/wix");
        let err = toolchain.check_required_tools().unwrap_err();
        assert!(matches!(err, ToolchainError::NotFound { ref tool, .. } if tool == "heat"));
    }
}
