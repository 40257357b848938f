pub mod artifact;

pub use artifact::find_artifact;
pub use artifact::ArtifactDescriptor;
pub use artifact::ArtifactLayout;
pub use artifact::VersionProbeKind;
pub use artifact::MANIFEST;
