use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the distribution backend.
/// Every module returns `Result<T, InstallerError>`.
#[derive(Debug, Error)]
pub enum InstallerError {
    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Listings ────────────────────────────────────────
    #[error("Malformed data: {0}")]
    MalformedData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Server ──────────────────────────────────────────
    #[error("Could not bind server to {addr}: {source}")]
    ServerBind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    // ── Batch ───────────────────────────────────────────
    #[error("A download batch is already running")]
    BatchInProgress,

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type InstallerResult<T> = Result<T, InstallerError>;

impl From<std::io::Error> for InstallerError {
    fn from(source: std::io::Error) -> Self {
        InstallerError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

impl InstallerError {
    /// True for failures that only affect one artifact or subtree.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            InstallerError::Http(_) | InstallerError::DownloadFailed { .. }
        )
    }
}
