use reqwest::{Client, StatusCode};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::state::settings::{EndpointSet, InstallerSettings, Mode};
use crate::core::transport::{BackendConfig, BackendSet};

/// Picks the backend set for a session.
///
/// The object-storage health probe runs at most once per resolver; every later
/// `resolve` reuses its answer.
pub struct BackendResolver {
    client: Client,
    healthcheck_url: String,
    production: EndpointSet,
    development: EndpointSet,
    object_storage_reachable: OnceCell<bool>,
}

impl BackendResolver {
    pub fn new(client: Client, settings: &InstallerSettings) -> Self {
        Self {
            client,
            healthcheck_url: settings.healthcheck_url.clone(),
            production: settings.production.clone(),
            development: settings.development.clone(),
            object_storage_reachable: OnceCell::new(),
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, mode: Mode) -> InstallerResult<BackendSet> {
        let endpoints = match mode {
            Mode::Production => &self.production,
            Mode::Development => &self.development,
        };

        if endpoints.object_storage.is_none() && endpoints.folder_listing.is_none() {
            return Err(InstallerError::Configuration(format!(
                "no backends configured for {} mode",
                mode.as_str()
            )));
        }

        if let Some(bucket) = &endpoints.object_storage {
            if self.object_storage_reachable().await {
                info!("Programs downloading from object storage ({})", mode.as_str());
                return Ok(BackendSet {
                    programs: BackendConfig::object_storage(&bucket.programs_bucket_url, None),
                    launcher: BackendConfig::object_storage(
                        &bucket.launcher_host_url,
                        Some(bucket.launcher_bucket.clone()),
                    ),
                });
            }
        }

        let Some(hosts) = &endpoints.folder_listing else {
            return Err(InstallerError::Configuration(format!(
                "object storage unreachable and no folder-listing fallback for {} mode",
                mode.as_str()
            )));
        };
        info!("Programs downloading from folder-listing hosts ({})", mode.as_str());
        Ok(BackendSet {
            programs: BackendConfig::direct_zip(&hosts.programs_url),
            launcher: BackendConfig::folder_listing(&hosts.launcher_url),
        })
    }

    pub async fn object_storage_reachable(&self) -> bool {
        *self
            .object_storage_reachable
            .get_or_init(|| probe(&self.client, &self.healthcheck_url))
            .await
    }
}

/// Whether the general internet probe answers.
pub async fn has_internet_access(client: &Client, probe_url: &str) -> bool {
    probe(client, probe_url).await
}

/// A plain GET; success or `403 Forbidden` both count as reachable.
async fn probe(client: &Client, url: &str) -> bool {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            debug!("Probe {} answered {}", url, status);
            status.is_success() || status == StatusCode::FORBIDDEN
        }
        Err(e) => {
            debug!("Probe {} failed: {}", url, e);
            false
        }
    }
}
