pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{InstallerError, InstallerResult};
pub use crate::core::orchestrator::{BatchReport, Orchestrator};
pub use crate::core::progress::{InstallerEvent, ProgressSink, Reporter};
pub use crate::core::server::DistributionServer;
pub use crate::core::state::{InstallerContext, InstallerSettings, Mode};

/// Initialize structured logging from `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,offline_installer_lib=debug")),
        )
        .init();
}
