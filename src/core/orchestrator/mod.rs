pub mod session;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::core::downloader::bucket::fetch_bucket_tree;
use crate::core::downloader::{FetchStats, FolderFetcher, ProgressScope};
use crate::core::error::{InstallerError, InstallerResult};
use crate::core::manifest::{ArtifactDescriptor, ArtifactLayout, MANIFEST};
use crate::core::state::{InstallerContext, Mode};
use crate::core::transport::folder_listing::FOLDER_LISTING_ROOT;
use crate::core::transport::{BackendConfig, BackendKind};
use crate::core::version::probe_version_async;

pub use session::{ArtifactFailure, BatchReport, DownloadSession};

/// Runs download batches over the manifest.
///
/// Batches are single-flight per [`InstallerContext`], so orchestrators that
/// share a context also share the slot.
pub struct Orchestrator {
    context: Arc<InstallerContext>,
}

impl Orchestrator {
    pub fn new(context: Arc<InstallerContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<InstallerContext> {
        &self.context
    }

    pub fn is_running(&self) -> bool {
        self.context.batch_running()
    }

    /// Run [`Orchestrator::run_batch`] on a background task.
    pub fn spawn_batch(self: &Arc<Self>, mode: Mode) -> JoinHandle<InstallerResult<BatchReport>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.run_batch(mode).await })
    }

    /// Download (and where needed extract) every manifest artifact in order.
    ///
    /// A failing artifact is logged and skipped; only an unresolvable backend
    /// or an already-running batch ends the call early.
    #[instrument(skip(self))]
    pub async fn run_batch(&self, mode: Mode) -> InstallerResult<BatchReport> {
        let _guard = self
            .context
            .try_begin_batch()
            .ok_or(InstallerError::BatchInProgress)?;
        let reporter = &self.context.reporter;

        reporter.log(format!("Downloading software from {}.", mode.as_str()));
        let backends = match self.context.resolver.resolve(mode).await {
            Ok(backends) => backends,
            Err(e) => {
                reporter.log(format!("Download incomplete: {e}"));
                reporter.reset();
                return Err(e);
            }
        };

        let mut session = DownloadSession::new(mode, backends);
        info!(session = %session.id, "Batch started");

        for artifact in MANIFEST.iter() {
            match self.process_artifact(&session, artifact).await {
                Ok(()) => session.record_success(artifact.name),
                Err(e) => {
                    let kind = if e.is_transport() { "transport" } else { "local" };
                    warn!(artifact = artifact.name, kind, "Artifact failed: {}", e);
                    reporter.log(format!(
                        "Could not update {}: {}",
                        artifact.display_name(),
                        e
                    ));
                    session.record_failure(artifact.name, &e);
                }
            }
            info!(
                session = %session.id,
                "{} handled, batch {}% done",
                artifact.name,
                session.overall_percent()
            );
        }

        let report = session.finish();
        reporter.log(format!("Software downloaded from {}.", mode.as_str()));
        reporter.reset();
        reporter.batch_complete(report.clone());
        Ok(report)
    }

    async fn process_artifact(
        &self,
        session: &DownloadSession,
        artifact: &'static ArtifactDescriptor,
    ) -> InstallerResult<()> {
        let backend = session.backends.for_artifact(artifact);
        match artifact.layout {
            ArtifactLayout::Archive { extract } => {
                self.fetch_archive(backend, artifact, extract).await
            }
            ArtifactLayout::Tree => self.fetch_tree(backend, artifact).await,
        }
    }

    async fn fetch_archive(
        &self,
        backend: &BackendConfig,
        artifact: &'static ArtifactDescriptor,
        extract: bool,
    ) -> InstallerResult<()> {
        let reporter = &self.context.reporter;
        let programs_dir = self.context.programs_dir();
        let archive_path = artifact.archive_path(&programs_dir);
        let url = backend.archive_url(artifact);

        reporter.status(format!("Downloading {} software.", artifact.display_name()));
        reporter.log(format!(
            "Downloading {} from {:?} backend.",
            artifact.display_name(),
            backend.kind
        ));
        self.context
            .downloader()
            .download_file(
                &url,
                &archive_path,
                Some(ProgressScope {
                    artifact: artifact.name,
                    label: artifact.archive_file,
                }),
            )
            .await?;
        reporter.log("File downloaded successfully.");

        if extract {
            reporter.status(format!("Extracting {} software.", artifact.display_name()));
            self.context
                .extractor()
                .extract(
                    artifact,
                    &archive_path,
                    &artifact.extracted_path(&programs_dir),
                    false,
                )
                .await?;
        }
        Ok(())
    }

    async fn fetch_tree(
        &self,
        backend: &BackendConfig,
        artifact: &'static ArtifactDescriptor,
    ) -> InstallerResult<()> {
        let reporter = &self.context.reporter;
        let programs_dir = self.context.programs_dir();
        let destination = artifact.extracted_path(&programs_dir);
        let downloader = self.context.downloader();

        reporter.status(format!("Downloading {} software.", artifact.display_name()));
        let stats: FetchStats = match backend.kind {
            BackendKind::ObjectStorage => {
                fetch_bucket_tree(&downloader, backend, artifact.name, &destination).await?
            }
            BackendKind::FolderListing => {
                let listing_url = format!("{}/{}", backend.base_url, FOLDER_LISTING_ROOT);
                FolderFetcher::new(&downloader, artifact.name)
                    .fetch_tree(&listing_url, &destination, artifact.extracted_dir)
                    .await?
            }
            BackendKind::DirectZip => return self.fetch_archive(backend, artifact, true).await,
        };

        if stats.failed > 0 {
            return Err(InstallerError::Other(format!(
                "{} of {} {} files failed to download",
                stats.failed,
                stats.failed + stats.files,
                artifact.name
            )));
        }
        reporter.log(format!(
            "{} folder downloaded successfully ({} files).",
            artifact.display_name(),
            stats.files
        ));

        if let Some(version) = probe_version_async(artifact, &programs_dir).await {
            reporter.log(format!("{} version: {}", artifact.display_name(), version));
            self.context.versions.set(artifact.name, version);
        }
        Ok(())
    }
}
