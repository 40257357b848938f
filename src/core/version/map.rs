use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

/// Installed version of one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactVersion {
    Known(String),
    /// Source exists but no version could be read from it.
    Unknown,
    /// Version file or executable is absent.
    NotFound,
}

impl ArtifactVersion {
    pub fn from_contents(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            ArtifactVersion::Unknown
        } else {
            ArtifactVersion::Known(trimmed.to_string())
        }
    }

    pub fn known(&self) -> Option<&str> {
        match self {
            ArtifactVersion::Known(version) => Some(version),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactVersion::Known(version) => f.write_str(version),
            ArtifactVersion::Unknown => f.write_str("Unknown"),
            ArtifactVersion::NotFound => f.write_str("Not found"),
        }
    }
}

/// Artifact name → installed version.
///
/// Written only once an artifact's extraction or fetch has fully finished;
/// the distribution server only reads it.
#[derive(Debug, Clone, Default)]
pub struct VersionMap {
    inner: Arc<RwLock<HashMap<String, ArtifactVersion>>>,
}

impl VersionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, artifact: &str) -> Option<ArtifactVersion> {
        self.inner.read().get(&artifact.to_ascii_lowercase()).cloned()
    }

    pub fn set(&self, artifact: &str, version: ArtifactVersion) {
        self.inner.write().insert(artifact.to_ascii_lowercase(), version);
    }

    /// Sorted copy for display.
    pub fn snapshot(&self) -> Vec<(String, ArtifactVersion)> {
        let mut entries: Vec<_> = self
            .inner
            .read()
            .iter()
            .map(|(name, version)| (name.clone(), version.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
