use std::path::{Path, PathBuf};

use tracing::instrument;

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::progress::{item_percent, Phase};
use crate::core::transport::object_store::list_objects;
use crate::core::transport::BackendConfig;
use crate::core::version::probe::version_from_file;
use crate::core::version::ArtifactVersion;

use super::client::Downloader;
use super::folder::{sanitize_file_name, FetchStats};

pub const LATEST_YAML: &str = "latest.yml";

/// Mirror every object under the backend's bucket prefix into `destination_dir`.
///
/// `latest.yml` is fetched first; without a readable version in it the
/// fetch is abandoned before anything else is downloaded.
#[instrument(skip(downloader))]
pub async fn fetch_bucket_tree(
    downloader: &Downloader,
    backend: &BackendConfig,
    artifact: &str,
    destination_dir: &Path,
) -> InstallerResult<FetchStats> {
    let reporter = downloader.reporter();
    let latest_path = destination_dir.join(LATEST_YAML);
    downloader
        .download_file(&backend.object_url(LATEST_YAML), &latest_path, None)
        .await?;

    let version = match version_from_file(&latest_path) {
        ArtifactVersion::Known(version) => version,
        _ => {
            return Err(InstallerError::MalformedData(format!(
                "could not read a version from {LATEST_YAML}"
            )))
        }
    };
    reporter.log(format!("Latest {artifact} release is {version}."));

    let objects: Vec<_> = list_objects(downloader.client(), backend)
        .await?
        .into_iter()
        .filter(|object| object.key != LATEST_YAML)
        .collect();

    let total = objects.len();
    let label = destination_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| artifact.to_string());
    let mut stats = FetchStats {
        files: 1,
        failed: 0,
    };
    for (index, object) in objects.iter().enumerate() {
        let dest = local_path_for_key(destination_dir, &object.key);
        match downloader
            .download_file(&backend.object_url(&object.key), &dest, None)
            .await
        {
            Ok(_) => {
                stats.files += 1;
                reporter.log(format!(
                    "File downloaded successfully {} of {}.",
                    index + 1,
                    total
                ));
            }
            Err(e) => {
                stats.failed += 1;
                reporter.log(format!(
                    "An error occurred during file download of {}: {}",
                    object.key, e
                ));
            }
        }
        reporter.progress(artifact, &label, item_percent(index + 1, total), Phase::Downloading);
    }

    Ok(stats)
}

/// Map a `/`-separated object key onto sanitized local path components.
fn local_path_for_key(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |path, part| {
            path.join(sanitize_file_name(part))
        })
}
