pub mod backend;
pub mod folder_listing;
pub mod object_store;

pub use backend::{BackendConfig, BackendKind, BackendSet};
pub use folder_listing::{FolderListing, FolderNode, NodeKind};
pub use object_store::ObjectInfo;
