use serde::Serialize;
use uuid::Uuid;

use crate::core::error::InstallerError;
use crate::core::manifest::MANIFEST;
use crate::core::progress::item_percent;
use crate::core::state::Mode;
use crate::core::transport::{BackendKind, BackendSet};

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactFailure {
    pub artifact: String,
    pub error: String,
}

/// Outcome of one batch, also delivered with the batch-complete event.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub session_id: Uuid,
    pub mode: Mode,
    pub programs_backend: BackendKind,
    pub launcher_backend: BackendKind,
    pub succeeded: Vec<String>,
    pub failed: Vec<ArtifactFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Mutable state of one running batch. Owned by the orchestrator task.
#[derive(Debug)]
pub struct DownloadSession {
    pub id: Uuid,
    pub mode: Mode,
    pub backends: BackendSet,
    current: usize,
    succeeded: Vec<String>,
    failed: Vec<ArtifactFailure>,
}

impl DownloadSession {
    pub fn new(mode: Mode, backends: BackendSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            backends,
            current: 0,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Index of the artifact currently being processed.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Share of the manifest already handled, success or not.
    pub fn overall_percent(&self) -> f64 {
        item_percent(self.succeeded.len() + self.failed.len(), MANIFEST.len())
    }

    pub fn record_success(&mut self, artifact: &str) {
        self.succeeded.push(artifact.to_string());
        self.current += 1;
    }

    pub fn record_failure(&mut self, artifact: &str, error: &InstallerError) {
        self.failed.push(ArtifactFailure {
            artifact: artifact.to_string(),
            error: error.to_string(),
        });
        self.current += 1;
    }

    pub fn finish(self) -> BatchReport {
        BatchReport {
            session_id: self.id,
            mode: self.mode,
            programs_backend: self.backends.programs.kind,
            launcher_backend: self.backends.launcher.kind,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }
}
