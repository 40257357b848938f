use std::path::{Path, PathBuf};

use serde::Serialize;

/// Argument that makes a program write its version to `_logs/version.txt`.
pub const REPORT_VERSION_ARG: &str = "writeversion";
/// Version output file, relative to the extracted program directory.
pub const VERSION_OUTPUT_FILE: &str = "_logs/version.txt";

/// How an installed version is derived for an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionProbeKind {
    /// Scan a YAML-ish manifest file for `version: x.y.z`.
    RegexFile { file: &'static str },
    /// Run the program with [`REPORT_VERSION_ARG`] and read [`VERSION_OUTPUT_FILE`].
    InvokeAndRead,
}

/// What a backend delivers for this artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactLayout {
    /// A single zip, optionally expanded next to itself.
    Archive { extract: bool },
    /// A directory tree fetched file by file.
    Tree,
}

/// One bundle the installer knows how to fetch and re-serve.
///
/// All paths are relative to the `_programs` directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactDescriptor {
    /// Lowercase name used in routes and the version map.
    pub name: &'static str,
    /// Object-storage key of the archive.
    pub remote_key: &'static str,
    /// Local archive file name.
    pub archive_file: &'static str,
    /// Directory the artifact is expanded or fetched into.
    pub extracted_dir: &'static str,
    /// Executable stem inside `extracted_dir`, without platform suffix.
    pub executable_stem: Option<&'static str>,
    pub layout: ArtifactLayout,
    pub version_probe: Option<VersionProbeKind>,
}

impl ArtifactDescriptor {
    pub fn archive_path(&self, programs_dir: &Path) -> PathBuf {
        programs_dir.join(self.archive_file)
    }

    pub fn extracted_path(&self, programs_dir: &Path) -> PathBuf {
        programs_dir.join(self.extracted_dir)
    }

    pub fn executable_path(&self, programs_dir: &Path) -> Option<PathBuf> {
        self.executable_stem
            .map(|stem| self.extracted_path(programs_dir).join(executable_file_name(stem)))
    }

    /// Capitalised name for user-facing status lines.
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

pub fn executable_file_name(stem: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{stem}.exe")
    } else {
        stem.to_string()
    }
}

pub const LAUNCHER_DIR: &str = "electron-launcher";
pub const LAUNCHER_VERSION_FILE: &str = "electron-launcher/latest.yml";

/// Fixed, ordered manifest. The launcher is last so its version is checked last.
pub static MANIFEST: [ArtifactDescriptor; 4] = [
    ArtifactDescriptor {
        name: "nuc",
        remote_key: "NUC/NUC.zip",
        archive_file: "NUC.zip",
        extracted_dir: "NUC",
        executable_stem: Some("NUC"),
        layout: ArtifactLayout::Archive { extract: true },
        version_probe: Some(VersionProbeKind::InvokeAndRead),
    },
    ArtifactDescriptor {
        name: "station",
        remote_key: "Station/Station.zip",
        archive_file: "Station.zip",
        extracted_dir: "Station",
        executable_stem: Some("Station"),
        layout: ArtifactLayout::Archive { extract: true },
        version_probe: Some(VersionProbeKind::InvokeAndRead),
    },
    ArtifactDescriptor {
        name: "steamcmd",
        remote_key: "steamcmd/steamcmd.zip",
        archive_file: "steamcmd.zip",
        extracted_dir: "steamcmd",
        executable_stem: None,
        layout: ArtifactLayout::Archive { extract: false },
        version_probe: None,
    },
    ArtifactDescriptor {
        name: "launcher",
        remote_key: "electron-launcher",
        archive_file: "electron-launcher.zip",
        extracted_dir: LAUNCHER_DIR,
        executable_stem: None,
        layout: ArtifactLayout::Tree,
        version_probe: Some(VersionProbeKind::RegexFile {
            file: LAUNCHER_VERSION_FILE,
        }),
    },
];

/// Case-insensitive manifest lookup.
pub fn find_artifact(name: &str) -> Option<&'static ArtifactDescriptor> {
    MANIFEST
        .iter()
        .find(|artifact| artifact.name.eq_ignore_ascii_case(name))
}
