use serde::Serialize;

use crate::core::manifest::ArtifactDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// S3-compatible bucket: key GET and list-with-prefix.
    ObjectStorage,
    /// HTTP service returning JSON `{type, name}` directory listings.
    FolderListing,
    /// HTTP service answering `GET /program-<artifact>` with the zip.
    DirectZip,
}

/// One remote source, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    pub bucket: Option<String>,
}

impl BackendConfig {
    pub fn object_storage(base_url: impl Into<String>, bucket: Option<String>) -> Self {
        Self {
            kind: BackendKind::ObjectStorage,
            base_url: trim_url(base_url.into()),
            bucket,
        }
    }

    pub fn folder_listing(base_url: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::FolderListing,
            base_url: trim_url(base_url.into()),
            bucket: None,
        }
    }

    pub fn direct_zip(base_url: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::DirectZip,
            base_url: trim_url(base_url.into()),
            bucket: None,
        }
    }

    /// URL of an artifact's zip on this backend.
    pub fn archive_url(&self, artifact: &ArtifactDescriptor) -> String {
        match self.kind {
            BackendKind::ObjectStorage => self.object_url(artifact.remote_key),
            BackendKind::DirectZip => format!("{}/program-{}", self.base_url, artifact.name),
            BackendKind::FolderListing => format!("{}/{}", self.base_url, artifact.archive_file),
        }
    }

    /// `<base>/<bucket>/<key>` for buckets addressed by prefix, `<base>/<key>` otherwise.
    pub fn object_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match &self.bucket {
            Some(bucket) => format!("{}/{}/{}", self.base_url, bucket, key),
            None => format!("{}/{}", self.base_url, key),
        }
    }
}

/// Backends chosen by the resolver for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendSet {
    /// Source of the zipped programs.
    pub programs: BackendConfig,
    /// Source of the launcher tree.
    pub launcher: BackendConfig,
}

impl BackendSet {
    pub fn for_artifact(&self, artifact: &ArtifactDescriptor) -> &BackendConfig {
        match artifact.layout {
            crate::core::manifest::ArtifactLayout::Tree => &self.launcher,
            crate::core::manifest::ArtifactLayout::Archive { .. } => &self.programs,
        }
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
