// ─── Offline Installer Core ───
// Fetches LeadMe program bundles and re-serves them on the local network.
//
// Architecture:
//   core/
//     state/        — Settings + shared installer context
//     manifest/     — Static artifact manifest
//     progress/     — Progress/log events and the sink trait
//     transport/    — Backend configs, S3 listing, folder listing
//     resolver/     — Health probe + backend selection
//     downloader/   — Streaming file, folder-tree and bucket-tree fetches
//     archive/      — Zip extraction
//     version/      — Version map + probes
//     orchestrator/ — Sequential batch over the manifest
//     server/       — LAN distribution server (axum)

pub mod archive;
pub mod downloader;
pub mod error;
pub mod http;
pub mod manifest;
pub mod orchestrator;
pub mod progress;
pub mod resolver;
pub mod server;
pub mod state;
pub mod transport;
pub mod version;
