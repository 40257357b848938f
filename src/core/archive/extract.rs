use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::manifest::ArtifactDescriptor;
use crate::core::progress::{round_percent, Phase, Reporter};
use crate::core::version::{probe_version_async, VersionMap};

pub const EXTRACT_CHUNK_SIZE: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Unpack a zip into `destination_dir`, calling `on_progress` with 0 first and
/// then after every chunk with the share of uncompressed bytes written so far
/// (two decimals).
///
/// Blocking; run it on the blocking pool.
pub fn extract_zip(
    archive_path: &Path,
    destination_dir: &Path,
    mut on_progress: impl FnMut(f64),
) -> InstallerResult<ExtractOutcome> {
    if !archive_path.is_file() {
        return Err(InstallerError::NotFound(archive_path.to_path_buf()));
    }

    let zip_file = File::open(archive_path).map_err(|source| InstallerError::Io {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(zip_file)?;

    let total_bytes = (0..archive.len())
        .map(|index| archive.by_index_raw(index).map(|entry| entry.size()))
        .sum::<Result<u64, _>>()?;

    create_dir(destination_dir)?;

    on_progress(0.0);
    let mut outcome = ExtractOutcome::default();
    let mut buffer = vec![0_u8; EXTRACT_CHUNK_SIZE];
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping zip entry outside the destination: {}", entry.name());
            continue;
        };
        let out_path = destination_dir.join(relative);

        if entry.is_dir() {
            create_dir(&out_path)?;
            outcome.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            create_dir(parent)?;
        }

        let mut out = File::create(&out_path).map_err(|source| InstallerError::Io {
            path: out_path.clone(),
            source,
        })?;
        loop {
            let read = entry.read(&mut buffer).map_err(|source| InstallerError::Io {
                path: archive_path.to_path_buf(),
                source,
            })?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read])
                .map_err(|source| InstallerError::Io {
                    path: out_path.clone(),
                    source,
                })?;
            outcome.bytes += read as u64;
            if total_bytes > 0 {
                on_progress(round_percent(
                    outcome.bytes as f64 / total_bytes as f64 * 100.0,
                ));
            }
        }
        drop(out);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode().filter(|mode| mode & 0o777 != 0) {
                std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode & 0o777))
                    .map_err(|source| InstallerError::Io {
                        path: out_path.clone(),
                        source,
                    })?;
            }
        }

        outcome.files += 1;
    }

    if total_bytes == 0 {
        on_progress(100.0);
    }
    Ok(outcome)
}

fn create_dir(path: &Path) -> InstallerResult<()> {
    std::fs::create_dir_all(path).map_err(|source| InstallerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Extracts downloaded bundles and refreshes their installed version.
#[derive(Clone)]
pub struct ArchiveExtractor {
    programs_dir: PathBuf,
    versions: VersionMap,
    reporter: Reporter,
}

impl ArchiveExtractor {
    pub fn new(programs_dir: PathBuf, versions: VersionMap, reporter: Reporter) -> Self {
        Self {
            programs_dir,
            versions,
            reporter,
        }
    }

    /// Extract `archive_path` into `destination_dir`, optionally delete the
    /// archive, then probe the artifact's version.
    ///
    /// The version map is only touched after every entry has been written.
    #[instrument(skip(self, artifact), fields(artifact = artifact.name))]
    pub async fn extract(
        &self,
        artifact: &'static ArtifactDescriptor,
        archive_path: &Path,
        destination_dir: &Path,
        delete_source_after: bool,
    ) -> InstallerResult<ExtractOutcome> {
        let reporter = self.reporter.clone();
        let label = archive_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let source = archive_path.to_path_buf();
        let destination = destination_dir.to_path_buf();

        let result = tokio::task::spawn_blocking(move || {
            extract_zip(&source, &destination, |percent| {
                reporter.progress(artifact.name, &label, percent, Phase::Extracting)
            })
        })
        .await
        .map_err(|e| InstallerError::Other(format!("Task join error: {e}")))?;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(InstallerError::NotFound(path)) => {
                self.reporter.log(format!("Cannot find {}.", path.display()));
                return Err(InstallerError::NotFound(path));
            }
            Err(e) => return Err(e),
        };
        self.reporter.log("Folder unzipped successfully.");
        debug!(
            "Extracted {} files ({} bytes) into {:?}",
            outcome.files, outcome.bytes, destination_dir
        );

        if delete_source_after && archive_path.exists() {
            tokio::fs::remove_file(archive_path)
                .await
                .map_err(|source| InstallerError::Io {
                    path: archive_path.to_path_buf(),
                    source,
                })?;
            self.reporter.log("Zipped folder deleted successfully.");
        }

        if let Some(version) = probe_version_async(artifact, &self.programs_dir).await {
            self.reporter
                .log(format!("{} version: {}", artifact.display_name(), version));
            self.versions.set(artifact.name, version);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;

    fn build_zip(path: &Path) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer.add_directory("bin/", options).unwrap();
        writer.add_directory("bin/empty-dir/", options).unwrap();
        writer.start_file("bin/app.dat", options).unwrap();
        writer.write_all(&vec![7_u8; 40_000]).unwrap();
        writer.start_file("README.md", options).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.start_file("logs/empty.txt", options).unwrap();
        writer.finish().unwrap();
    }

    #[test]
    fn recreates_structure_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        build_zip(&archive);
        let dest = dir.path().join("out");

        let mut seen = Vec::new();
        let outcome = extract_zip(&archive, &dest, |p| seen.push(p)).unwrap();

        assert_eq!(outcome.files, 3);
        assert_eq!(outcome.directories, 2);
        assert_eq!(outcome.bytes, 40_005);
        assert!(dest.join("bin").join("empty-dir").is_dir());
        assert_eq!(std::fs::read(dest.join("bin").join("app.dat")).unwrap().len(), 40_000);
        assert_eq!(std::fs::metadata(dest.join("logs").join("empty.txt")).unwrap().len(), 0);

        assert_eq!(seen.first().copied(), Some(0.0));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(100.0));
    }

    #[test]
    fn archive_of_empty_entries_still_reports_both_ends() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("empty.zip");
        let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
        writer.add_directory("only-a-dir/", SimpleFileOptions::default()).unwrap();
        writer.finish().unwrap();

        let mut seen = Vec::new();
        extract_zip(&archive, &dir.path().join("out"), |p| seen.push(p)).unwrap();
        assert_eq!(seen, vec![0.0, 100.0]);
    }

    #[test]
    fn missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_zip(&dir.path().join("nope.zip"), dir.path(), |_| {}).unwrap_err();
        assert!(matches!(err, InstallerError::NotFound(_)));
    }

    #[tokio::test]
    async fn extract_can_delete_the_archive_and_still_refresh_the_version() {
        use crate::core::manifest::find_artifact;
        use crate::core::version::ArtifactVersion;

        let dir = tempfile::tempdir().unwrap();
        let programs = dir.path().to_path_buf();
        let archive = programs.join("electron-launcher.zip");
        let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
        writer.start_file("latest.yml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"version: 4.2.0\n").unwrap();
        writer.finish().unwrap();

        let versions = VersionMap::new();
        let extractor = ArchiveExtractor::new(programs.clone(), versions.clone(), Reporter::silent());
        let launcher = find_artifact("launcher").unwrap();
        let outcome = extractor
            .extract(launcher, &archive, &launcher.extracted_path(&programs), true)
            .await
            .unwrap();

        assert_eq!(outcome.files, 1);
        assert!(!archive.exists());
        assert!(programs.join("electron-launcher").join("latest.yml").is_file());
        assert_eq!(versions.get("launcher"), Some(ArtifactVersion::Known("4.2.0".into())));
    }

    #[tokio::test]
    async fn failed_extraction_keeps_previous_version() {
        use crate::core::manifest::find_artifact;
        use crate::core::version::ArtifactVersion;

        let dir = tempfile::tempdir().unwrap();
        let programs = dir.path().to_path_buf();
        std::fs::write(programs.join("Station.zip"), b"not a zip").unwrap();

        let versions = VersionMap::new();
        versions.set("station", ArtifactVersion::Known("1.0.0".into()));
        let extractor = ArchiveExtractor::new(programs.clone(), versions.clone(), Reporter::silent());

        let station = find_artifact("station").unwrap();
        let result = extractor
            .extract(station, &programs.join("Station.zip"), &programs.join("Station"), false)
            .await;

        assert!(matches!(result, Err(InstallerError::Zip(_))));
        assert_eq!(versions.get("station"), Some(ArtifactVersion::Known("1.0.0".into())));
    }
}
