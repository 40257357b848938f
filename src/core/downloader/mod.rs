pub mod bucket;
pub mod client;
pub mod folder;

pub use client::{Downloader, ProgressScope, DOWNLOAD_CHUNK_SIZE};
pub use folder::{sanitize_file_name, FetchStats, FolderFetcher};
