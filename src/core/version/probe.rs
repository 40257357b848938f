use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::core::manifest::artifact::{REPORT_VERSION_ARG, VERSION_OUTPUT_FILE};
use crate::core::manifest::{ArtifactDescriptor, VersionProbeKind, MANIFEST};

use super::map::{ArtifactVersion, VersionMap};

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"version:\s*(\d+\.\d+\.\d+)").unwrap())
}

/// Derive an artifact's installed version. `None` when the artifact has no probe.
///
/// Blocking: may launch the artifact's executable and wait for it.
pub fn probe_version(artifact: &ArtifactDescriptor, programs_dir: &Path) -> Option<ArtifactVersion> {
    let version = match artifact.version_probe? {
        VersionProbeKind::RegexFile { file } => version_from_file(&programs_dir.join(file)),
        VersionProbeKind::InvokeAndRead => match artifact.executable_path(programs_dir) {
            Some(executable) => invoke_and_read(&executable, &artifact.extracted_path(programs_dir)),
            None => ArtifactVersion::NotFound,
        },
    };
    debug!("Probed {}: {}", artifact.name, version);
    Some(version)
}

/// [`probe_version`] on the blocking pool.
pub async fn probe_version_async(
    artifact: &'static ArtifactDescriptor,
    programs_dir: &Path,
) -> Option<ArtifactVersion> {
    let programs_dir = programs_dir.to_path_buf();
    match tokio::task::spawn_blocking(move || probe_version(artifact, &programs_dir)).await {
        Ok(version) => version,
        Err(e) => {
            warn!("Version probe for {} panicked: {}", artifact.name, e);
            Some(ArtifactVersion::Unknown)
        }
    }
}

/// Probe every manifest artifact and record the results.
pub async fn refresh_all_versions(programs_dir: &Path, versions: &VersionMap) {
    for artifact in MANIFEST.iter() {
        if let Some(version) = probe_version_async(artifact, programs_dir).await {
            versions.set(artifact.name, version);
        }
    }
}

pub fn version_from_text(content: &str) -> ArtifactVersion {
    match version_pattern().captures(content) {
        Some(captures) => ArtifactVersion::Known(captures[1].to_string()),
        None => ArtifactVersion::Unknown,
    }
}

pub fn version_from_file(path: &Path) -> ArtifactVersion {
    match std::fs::read_to_string(path) {
        Ok(content) => version_from_text(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ArtifactVersion::NotFound,
        Err(e) => {
            warn!("Could not read {:?}: {}", path, e);
            ArtifactVersion::Unknown
        }
    }
}

#[instrument]
pub fn invoke_and_read(executable: &Path, working_dir: &Path) -> ArtifactVersion {
    if !executable.is_file() {
        return ArtifactVersion::NotFound;
    }

    // A leftover file from an earlier install must not pass for this run's output.
    let output = working_dir.join(VERSION_OUTPUT_FILE);
    match std::fs::remove_file(&output) {
        Ok(()) => debug!("Removed previous {:?}", output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!("Could not clear {:?}: {}", output, e);
            return ArtifactVersion::Unknown;
        }
    }

    match Command::new(executable)
        .arg(REPORT_VERSION_ARG)
        .current_dir(working_dir)
        .status()
    {
        Ok(status) if !status.success() => {
            debug!("{:?} exited with {}", executable, status);
        }
        Ok(_) => {}
        Err(e) => {
            warn!("Could not run {:?}: {}", executable, e);
            return ArtifactVersion::Unknown;
        }
    }

    match std::fs::read_to_string(&output) {
        Ok(content) => ArtifactVersion::from_contents(&content),
        Err(e) => {
            warn!("No version output at {:?}: {}", output, e);
            ArtifactVersion::Unknown
        }
    }
}
