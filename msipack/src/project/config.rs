//! INI project definition files.
//!
//! ```ini
//! [project]
//! name = project
//! homepage = https://example.com
//! maintainer = Chef Software
//! install_dir = C:/project
//! build_version = 1.2.3
//! build_iteration = 2
//!
//! [msi]
//! upgrade_code = ABCD-1234
//!
//! [msi.parameters]
//! Key = value
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption, Properties};
use tracing::{debug, warn};

use super::{Project, DEFAULT_BUILD_ITERATION};
use crate::toolchain::SigningParams;

/// Section holding project metadata.
pub const PROJECT_SECTION: &str = "project";

/// Section holding MSI packager settings.
pub const MSI_SECTION: &str = "msi";

/// Section holding `<?define ?>` overrides for the parameters file.
pub const MSI_PARAMETERS_SECTION: &str = "msi.parameters";

const PROJECT_KEYS: &[&str] = &[
    "name",
    "friendly_name",
    "homepage",
    "maintainer",
    "install_dir",
    "build_version",
    "build_iteration",
    "resources_dir",
];

const MSI_KEYS: &[&str] = &["upgrade_code", "signing_thumbprint", "timestamp_url"];

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading a project definition.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the definition file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    ParseFailed { path: PathBuf, message: String },

    /// A required section is absent.
    MissingSection(String),

    /// A required key is absent.
    MissingKey { section: String, key: String },

    /// A key holds a value that cannot be used.
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::ParseFailed { path, message } => {
                write!(f, "failed to parse {}: {}", path.display(), message)
            }
            ConfigError::MissingSection(section) => {
                write!(f, "missing [{}] section", section)
            }
            ConfigError::MissingKey { section, key } => {
                write!(f, "missing required key '{}' in [{}]", key, section)
            }
            ConfigError::InvalidValue {
                section,
                key,
                value,
                reason,
            } => {
                write!(
                    f,
                    "invalid value '{}' for {}.{}: {}",
                    value, section, key, reason
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A parsed project definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    /// The `[project]` section.
    pub project: Project,

    /// `upgrade_code` from `[msi]`, if present.
    pub upgrade_code: Option<String>,

    /// Entries of `[msi.parameters]`.
    pub parameters: BTreeMap<String, String>,

    /// Signing settings from `[msi]`, if a thumbprint is configured.
    pub signing: Option<SigningParams>,
}

impl ProjectFile {
    /// Load a project definition from disk.
    ///
    /// Relative `install_dir` and `resources_dir` values are resolved against
    /// the directory containing the file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let ini = Ini::load_from_file_opt(path, parse_option()).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(parse) => ConfigError::ParseFailed {
                path: path.to_path_buf(),
                message: parse.to_string(),
            },
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        debug!(path = %path.display(), "Loading project definition");
        Self::from_ini(&ini, base_dir)
    }

    /// Parse a project definition from INI text.
    pub fn parse(content: &str, base_dir: &Path) -> ConfigResult<Self> {
        let ini = Ini::load_from_str_opt(content, parse_option()).map_err(|e| ConfigError::ParseFailed {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini, base_dir)
    }

    fn from_ini(ini: &Ini, base_dir: &Path) -> ConfigResult<Self> {
        let section = ini
            .section(Some(PROJECT_SECTION))
            .ok_or_else(|| ConfigError::MissingSection(PROJECT_SECTION.to_string()))?;
        warn_unknown_keys(PROJECT_SECTION, section, PROJECT_KEYS);

        let mut project = Project::new(required(section, PROJECT_SECTION, "name")?)
            .with_homepage(required(section, PROJECT_SECTION, "homepage")?)
            .with_maintainer(required(section, PROJECT_SECTION, "maintainer")?)
            .with_install_dir(resolve(
                base_dir,
                required(section, PROJECT_SECTION, "install_dir")?,
            ))
            .with_build_version(required(section, PROJECT_SECTION, "build_version")?);

        if let Some(name) = section.get("friendly_name") {
            project = project.with_friendly_name(name);
        }
        if let Some(value) = section.get("build_iteration") {
            project = project.with_build_iteration(parse_iteration(value)?);
        }
        if let Some(dir) = section.get("resources_dir") {
            project = project.with_resources_path(resolve(base_dir, dir));
        }

        let mut upgrade_code = None;
        let mut signing = None;
        if let Some(msi) = ini.section(Some(MSI_SECTION)) {
            warn_unknown_keys(MSI_SECTION, msi, MSI_KEYS);
            upgrade_code = msi.get("upgrade_code").map(str::to_string);
            if let Some(thumbprint) = msi.get("signing_thumbprint") {
                let mut params = SigningParams::new(thumbprint);
                if let Some(url) = msi.get("timestamp_url") {
                    params = params.with_timestamp_url(url);
                }
                signing = Some(params);
            } else if msi.contains_key("timestamp_url") {
                warn!("timestamp_url is ignored without signing_thumbprint");
            }
        }

        let mut parameters = BTreeMap::new();
        if let Some(section) = ini.section(Some(MSI_PARAMETERS_SECTION)) {
            for (key, value) in section.iter() {
                if parameters.insert(key.to_string(), value.to_string()).is_some() {
                    warn!(key, "Duplicate parameter, last value wins");
                }
            }
        }

        Ok(Self {
            project,
            upgrade_code,
            parameters,
            signing,
        })
    }
}

// Backslashes are literal so Windows paths survive unquoted.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn required<'a>(section: &'a Properties, name: &str, key: &str) -> ConfigResult<&'a str> {
    section.get(key).ok_or_else(|| ConfigError::MissingKey {
        section: name.to_string(),
        key: key.to_string(),
    })
}

fn parse_iteration(value: &str) -> ConfigResult<u32> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        section: PROJECT_SECTION.to_string(),
        key: "build_iteration".to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };

    match value.trim().parse::<u32>() {
        Ok(0) => Err(invalid("must be a positive integer")),
        Ok(n) => Ok(n),
        Err(_) => Err(invalid("not a number")),
    }
}

fn resolve(base_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    // Drive-letter paths like `C:/project` are not absolute on Unix hosts.
    if path.is_absolute() || is_windows_drive_path(value) {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn is_windows_drive_path(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

fn warn_unknown_keys(name: &str, section: &Properties, known: &[&str]) {
    for (key, _) in section.iter() {
        if !known.contains(&key) {
            warn!(section = name, key, "Ignoring unknown key");
        }
    }
}
