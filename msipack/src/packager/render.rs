//! WiX document generation.
//!
//! Each document is built fully in memory and only then written, so a failure
//! while assembling one never touches the file on disk.

use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use xml::common::XmlVersion;
use xml::writer::{EmitterConfig, EventWriter, XmlEvent};

use super::naming::{LOCALIZATION_FILE, PARAMETERS_FILE, SOURCE_FILE};
use super::{PackagerError, PackagerResult, Parameters};
use crate::project::Project;
use crate::toolchain::HARVEST_COMPONENT_GROUP;
use crate::version::NormalizedVersion;

const WIX_NAMESPACE: &str = "http://schemas.microsoft.com/wix/2006/wi";
const LOCALIZATION_NAMESPACE: &str = "http://schemas.microsoft.com/wix/2006/localization";

/// Windows language identifier for en-US.
const LANGUAGE_EN_US: u32 = 1033;

/// Code page of the localization strings (Western European).
pub const LOCALIZATION_CODEPAGE: u16 = 1252;

type Writer = EventWriter<Vec<u8>>;

fn writer() -> Writer {
    EmitterConfig::new()
        .perform_indent(true)
        .indent_string("  ")
        .create_writer(Vec::new())
}

fn emit<'a>(
    writer: &mut Writer,
    file: &'static str,
    event: impl Into<XmlEvent<'a>>,
) -> PackagerResult<()> {
    writer
        .write(event)
        .map_err(|e| PackagerError::RenderFailed {
            file,
            message: e.to_string(),
        })
}

fn start_document(writer: &mut Writer, file: &'static str) -> PackagerResult<()> {
    emit(
        writer,
        file,
        XmlEvent::StartDocument {
            version: XmlVersion::Version10,
            encoding: Some("utf-8"),
            standalone: None,
        },
    )
}

fn finish(writer: Writer, file: &'static str) -> PackagerResult<String> {
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| PackagerError::RenderFailed {
        file,
        message: e.to_string(),
    })
}

/// Render `localization-en-us.wxl`.
///
/// # Errors
///
/// [`PackagerError::InvalidValue`] if the product or manufacturer name has
/// characters outside [`LOCALIZATION_CODEPAGE`].
pub fn localization_document(project: &Project) -> PackagerResult<String> {
    let display_name = project.display_name();
    check_codepage("friendly_name", &display_name)?;
    check_codepage("maintainer", &project.maintainer)?;

    let file = LOCALIZATION_FILE;
    let codepage = LOCALIZATION_CODEPAGE.to_string();
    let mut w = writer();

    start_document(&mut w, file)?;
    emit(
        &mut w,
        file,
        XmlEvent::start_element("WixLocalization")
            .attr("Culture", "en-us")
            .attr("Codepage", &codepage)
            .default_ns(LOCALIZATION_NAMESPACE),
    )?;
    string_entry(&mut w, "LANGUAGE", &LANGUAGE_EN_US.to_string())?;
    string_entry(&mut w, "ProductName", &display_name)?;
    string_entry(&mut w, "ManufacturerName", &project.maintainer)?;
    string_entry(&mut w, "FeatureMainName", &display_name)?;
    string_entry(
        &mut w,
        "DowngradeErrorMessage",
        &format!("A newer version of {} is already installed.", display_name),
    )?;
    emit(&mut w, file, XmlEvent::end_element())?;

    finish(w, file)
}

fn string_entry(w: &mut Writer, id: &str, value: &str) -> PackagerResult<()> {
    emit(w, LOCALIZATION_FILE, XmlEvent::start_element("String").attr("Id", id))?;
    emit(w, LOCALIZATION_FILE, XmlEvent::characters(value))?;
    emit(w, LOCALIZATION_FILE, XmlEvent::end_element())
}

/// Render `parameters.wxi`.
///
/// Values are written raw: `<?define ?>` bodies are not entity-decoded, and
/// the setters already reject anything that would end the instruction.
pub fn parameters_document(
    version: &NormalizedVersion,
    upgrade_code: &str,
    parameters: &Parameters,
) -> PackagerResult<String> {
    let file = PARAMETERS_FILE;
    let mut w = writer();

    start_document(&mut w, file)?;
    emit(&mut w, file, XmlEvent::start_element("Include"))?;
    define(&mut w, "VersionNumber", &version.msi_version)?;
    define(&mut w, "DisplayVersionNumber", &version.display_version)?;
    define(&mut w, "UpgradeCode", upgrade_code)?;
    for (name, value) in parameters {
        define(&mut w, name, value)?;
    }
    emit(&mut w, file, XmlEvent::end_element())?;

    finish(w, file)
}

fn define(w: &mut Writer, name: &str, value: &str) -> PackagerResult<()> {
    let data = format!(r#"{}="{}" "#, name, value);
    emit(
        w,
        PARAMETERS_FILE,
        XmlEvent::processing_instruction("define", Some(data.as_str())),
    )
}

/// Render `source.wxs`.
pub fn source_document(project: &Project) -> PackagerResult<String> {
    let file = SOURCE_FILE;
    let cabinet = format!("{}.cab", project.name);
    let include = format!(r#""{}" "#, PARAMETERS_FILE);
    let mut w = writer();

    start_document(&mut w, file)?;
    emit(
        &mut w,
        file,
        XmlEvent::start_element("Wix").default_ns(WIX_NAMESPACE),
    )?;
    emit(
        &mut w,
        file,
        XmlEvent::processing_instruction("include", Some(include.as_str())),
    )?;

    emit(
        &mut w,
        file,
        XmlEvent::start_element("Product")
            .attr("Id", "*")
            .attr("Name", "!(loc.ProductName)")
            .attr("Language", "!(loc.LANGUAGE)")
            .attr("Version", "$(var.VersionNumber)")
            .attr("Manufacturer", "!(loc.ManufacturerName)")
            .attr("UpgradeCode", "$(var.UpgradeCode)"),
    )?;
    empty(
        &mut w,
        XmlEvent::start_element("Package")
            .attr("InstallerVersion", "200")
            .attr("InstallPrivileges", "elevated")
            .attr("Compressed", "yes")
            .attr("InstallScope", "perMachine"),
    )?;
    empty(
        &mut w,
        XmlEvent::start_element("Media")
            .attr("Id", "1")
            .attr("Cabinet", &cabinet)
            .attr("EmbedCab", "yes")
            .attr("CompressionLevel", "high"),
    )?;
    empty(
        &mut w,
        XmlEvent::start_element("MajorUpgrade")
            .attr("DowngradeErrorMessage", "!(loc.DowngradeErrorMessage)"),
    )?;
    if !project.homepage.is_empty() {
        empty(
            &mut w,
            XmlEvent::start_element("Property")
                .attr("Id", "ARPURLINFOABOUT")
                .attr("Value", &project.homepage),
        )?;
    }

    emit(
        &mut w,
        file,
        XmlEvent::start_element("Directory")
            .attr("Id", "TARGETDIR")
            .attr("Name", "SourceDir"),
    )?;
    emit(
        &mut w,
        file,
        XmlEvent::start_element("Directory").attr("Id", "WINDOWSVOLUME"),
    )?;
    emit(
        &mut w,
        file,
        XmlEvent::start_element("Directory")
            .attr("Id", "INSTALLLOCATION")
            .attr("Name", "opt"),
    )?;
    empty(
        &mut w,
        XmlEvent::start_element("Directory")
            .attr("Id", "PROJECTLOCATION")
            .attr("Name", &project.name),
    )?;
    for _ in 0..3 {
        emit(&mut w, file, XmlEvent::end_element())?;
    }
    empty(
        &mut w,
        XmlEvent::start_element("SetDirectory")
            .attr("Id", "WINDOWSVOLUME")
            .attr("Value", "[WindowsVolume]"),
    )?;

    emit(
        &mut w,
        file,
        XmlEvent::start_element("Feature")
            .attr("Id", "ProjectFeature")
            .attr("Title", "!(loc.FeatureMainName)")
            .attr("Level", "1")
            .attr("ConfigurableDirectory", "INSTALLLOCATION")
            .attr("Absent", "disallow")
            .attr("AllowAdvertise", "no"),
    )?;
    empty(
        &mut w,
        XmlEvent::start_element("ComponentGroupRef").attr("Id", HARVEST_COMPONENT_GROUP),
    )?;
    emit(&mut w, file, XmlEvent::end_element())?;

    empty(
        &mut w,
        XmlEvent::start_element("Property")
            .attr("Id", "WIXUI_INSTALLDIR")
            .attr("Value", "INSTALLLOCATION"),
    )?;
    empty(
        &mut w,
        XmlEvent::start_element("UIRef").attr("Id", "WixUI_InstallDir"),
    )?;

    emit(&mut w, file, XmlEvent::end_element())?;
    emit(&mut w, file, XmlEvent::end_element())?;

    finish(w, file)
}

/// Write an element with no children.
fn empty<'a>(
    w: &mut Writer,
    element: impl Into<XmlEvent<'a>>,
) -> PackagerResult<()> {
    emit(w, SOURCE_FILE, element)?;
    emit(w, SOURCE_FILE, XmlEvent::end_element())
}

/// Reject text that Windows code page 1252 cannot represent.
///
/// `light` stores localization strings in the package database using
/// [`LOCALIZATION_CODEPAGE`] and fails late on anything outside it.
fn check_codepage(attribute: &'static str, value: &str) -> PackagerResult<()> {
    match value.chars().find(|&c| !is_cp1252(c)) {
        Some(c) => Err(PackagerError::InvalidValue {
            attribute,
            reason: format!(
                "'{}' contains {:?} (U+{:04X}), which code page {} cannot represent",
                value, c, c as u32, LOCALIZATION_CODEPAGE
            ),
        }),
        None => Ok(()),
    }
}

fn is_cp1252(c: char) -> bool {
    // 0x80-0x9F of cp1252 map to these; 0x81, 0x8D, 0x8F, 0x90 and 0x9D are unassigned.
    const HIGH: &[char] = &[
        '€', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', 'Ž', '‘', '’', '“', '”', '•',
        '–', '—', '˜', '™', 'š', '›', 'œ', 'ž', 'Ÿ',
    ];
    matches!(c as u32, 0x00..=0x7F | 0xA0..=0xFF) || HIGH.contains(&c)
}

/// Replace the contents of `path` with `contents`.
///
/// The file is truncated on open and closed when this returns, on every path.
/// I/O errors are returned as-is inside [`PackagerError::WriteFailed`].
pub fn write_file(path: &Path, contents: &str) -> PackagerResult<()> {
    let write = || -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(contents.as_bytes())?;
        file.flush()
    };

    write().map_err(|source| PackagerError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
