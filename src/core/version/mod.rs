pub mod map;
pub mod probe;

pub use map::{ArtifactVersion, VersionMap};
pub use probe::{probe_version, probe_version_async, refresh_all_versions};
