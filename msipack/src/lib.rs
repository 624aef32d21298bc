//! msipack - Windows Installer packages from a staged application tree
//!
//! This library generates the WiX sources describing an MSI package and drives
//! the WiX toolset to compile and link them.
//!
//! - [`version`] - map free-form build versions onto MSI's numeric versions
//! - [`project`] - project metadata and the INI project definition file
//! - [`packager`] - settings, WiX file rendering and build orchestration
//! - [`toolchain`] - the external compiler/linker invoked on the rendered files

pub mod packager;
pub mod project;
pub mod toolchain;
pub mod version;
