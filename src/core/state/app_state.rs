use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, MutexGuard};

use crate::core::archive::ArchiveExtractor;
use crate::core::downloader::Downloader;
use crate::core::error::InstallerResult;
use crate::core::http::build_http_client;
use crate::core::progress::{ProgressSink, Reporter};
use crate::core::resolver::{has_internet_access, BackendResolver};
use crate::core::version::{refresh_all_versions, VersionMap};

use super::settings::InstallerSettings;

/// Everything the orchestrator and the server share for one process.
///
/// Cloned handles (`versions`, `reporter`) point at the same underlying state.
pub struct InstallerContext {
    pub settings: InstallerSettings,
    pub http_client: Client,
    pub versions: VersionMap,
    pub reporter: Reporter,
    pub resolver: BackendResolver,
    /// Held for the whole of a download batch; one batch per context.
    batch_lock: Mutex<()>,
}

impl InstallerContext {
    pub fn new(settings: InstallerSettings, sink: Arc<dyn ProgressSink>) -> InstallerResult<Self> {
        let http_client = build_http_client(settings.request_timeout())?;
        let resolver = BackendResolver::new(http_client.clone(), &settings);

        Ok(Self {
            settings,
            http_client,
            versions: VersionMap::new(),
            reporter: Reporter::new(sink),
            resolver,
            batch_lock: Mutex::new(()),
        })
    }

    pub fn programs_dir(&self) -> PathBuf {
        self.settings.programs_dir()
    }

    pub fn downloader(&self) -> Downloader {
        Downloader::new(self.http_client.clone(), self.reporter.clone())
    }

    pub fn extractor(&self) -> ArchiveExtractor {
        ArchiveExtractor::new(
            self.programs_dir(),
            self.versions.clone(),
            self.reporter.clone(),
        )
    }

    /// Claim the batch slot, or `None` if another batch holds it.
    pub fn try_begin_batch(&self) -> Option<MutexGuard<'_, ()>> {
        self.batch_lock.try_lock().ok()
    }

    pub fn batch_running(&self) -> bool {
        self.batch_lock.try_lock().is_err()
    }

    pub async fn has_internet_access(&self) -> bool {
        let connected =
            has_internet_access(&self.http_client, &self.settings.internet_probe_url).await;
        self.reporter
            .log(format!("Internet connection available: {connected}"));
        connected
    }

    /// Probe every installed artifact, as done at startup.
    pub async fn refresh_versions(&self) {
        refresh_all_versions(&self.programs_dir(), &self.versions).await;
    }
}
