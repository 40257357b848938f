use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::progress::{item_percent, Phase};
use crate::core::transport::folder_listing::fetch_listing;
use crate::core::transport::NodeKind;

use super::client::Downloader;

/// Listings nested deeper than this are not followed.
pub const MAX_FOLDER_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub files: usize,
    pub failed: usize,
}

impl FetchStats {
    fn absorb(&mut self, other: FetchStats) {
        self.files += other.files;
        self.failed += other.failed;
    }
}

/// Walks a JSON folder-listing tree, mirroring it on disk.
///
/// Progress is per listing level: after each well-formed entry of a level is
/// handled, `k * 100 / n` is reported with the level's path as label, where `n`
/// is the raw length of the listing. A level with malformed entries therefore
/// stops short of 100. Nested levels report their own percentages; there is no
/// byte-weighted total.
pub struct FolderFetcher<'a> {
    downloader: &'a Downloader,
    artifact: &'a str,
}

impl<'a> FolderFetcher<'a> {
    pub fn new(downloader: &'a Downloader, artifact: &'a str) -> Self {
        Self {
            downloader,
            artifact,
        }
    }

    /// Fetch `<base_url>/<folder_name>` into `<destination_dir>/<folder_name>`.
    pub async fn fetch_folder(
        &self,
        base_url: &str,
        folder_name: &str,
        destination_dir: &Path,
    ) -> InstallerResult<FetchStats> {
        let local_name = sanitize_file_name(folder_name);
        self.fetch_level(
            join_url(base_url, folder_name),
            destination_dir.join(&local_name),
            local_name,
            0,
        )
        .await
    }

    /// Fetch the listing at `listing_url` directly into `destination_dir`.
    pub async fn fetch_tree(
        &self,
        listing_url: &str,
        destination_dir: &Path,
        label: &str,
    ) -> InstallerResult<FetchStats> {
        self.fetch_level(
            listing_url.to_string(),
            destination_dir.to_path_buf(),
            label.to_string(),
            0,
        )
        .await
    }

    fn fetch_level(
        &self,
        url: String,
        dir: PathBuf,
        label: String,
        depth: usize,
    ) -> BoxFuture<'_, InstallerResult<FetchStats>> {
        Box::pin(async move {
            if depth > MAX_FOLDER_DEPTH {
                return Err(InstallerError::MalformedData(format!(
                    "folder tree under {url} is deeper than {MAX_FOLDER_DEPTH} levels"
                )));
            }

            let listing = fetch_listing(self.downloader.client(), &url).await?;
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| InstallerError::Io {
                    path: dir.clone(),
                    source: e,
                })?;

            let total = listing.entry_count;
            let mut stats = FetchStats::default();
            for (index, node) in listing.nodes.iter().enumerate() {
                let local_name = sanitize_file_name(&node.name);
                let child_url = join_url(&url, &node.name);
                let child_path = dir.join(&local_name);

                match node.kind {
                    NodeKind::File => {
                        match self
                            .downloader
                            .download_file(&child_url, &child_path, None)
                            .await
                        {
                            Ok(_) => stats.files += 1,
                            Err(e) => {
                                stats.failed += 1;
                                self.downloader
                                    .reporter()
                                    .log(format!("Failed to download '{}': {}", node.name, e));
                            }
                        }
                    }
                    NodeKind::Folder => {
                        let child_label = format!("{label}/{local_name}");
                        match self
                            .fetch_level(child_url, child_path, child_label, depth + 1)
                            .await
                        {
                            Ok(child) => stats.absorb(child),
                            Err(e) => {
                                stats.failed += 1;
                                self.downloader.reporter().log(format!(
                                    "Failed to download folder '{}': {}",
                                    node.name, e
                                ));
                            }
                        }
                    }
                    NodeKind::Other => {
                        debug!("Not fetching '{}': unsupported entry type", node.name)
                    }
                }

                self.downloader.reporter().progress(
                    self.artifact,
                    &label,
                    item_percent(index + 1, total),
                    Phase::Downloading,
                );
            }

            debug!("Fetched level {} ({} entries)", label, total);
            Ok(stats)
        })
    }
}

/// Replace characters that are not valid in file names with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_control() || INVALID.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    if sanitized == "." || sanitized == ".." {
        warn!("Refusing relative path component '{}'", name);
        return "_".repeat(sanitized.len());
    }
    sanitized
}

fn join_url(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_characters_become_underscores() {
        assert_eq!(sanitize_file_name("LeadMe Setup 1.2.3.exe"), "LeadMe Setup 1.2.3.exe");
        assert_eq!(sanitize_file_name("a:b*c?.txt"), "a_b_c_.txt");
        assert_eq!(sanitize_file_name("nested/../x"), "nested_.._x");
        assert_eq!(sanitize_file_name(".."), "__");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
    }

    #[test]
    fn urls_join_with_single_slash() {
        assert_eq!(join_url("http://h/download-folder/", "a b"), "http://h/download-folder/a b");
    }
}
