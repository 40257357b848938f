#![allow(dead_code)]

use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use offline_installer_lib::core::progress::{InstallerEvent, ProgressEvent};
use offline_installer_lib::core::state::settings::{
    EndpointSet, FolderListingEndpoints, ObjectStorageEndpoints,
};
use offline_installer_lib::{InstallerSettings, ProgressSink};

/// Serve `app` on an ephemeral loopback port and return its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Sink that keeps every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<InstallerEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InstallerEvent> {
        self.events.lock().clone()
    }

    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                InstallerEvent::Progress(progress) => Some(progress.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn progress_for(&self, label: &str) -> Vec<f64> {
        self.progress()
            .into_iter()
            .filter(|p| p.label == label)
            .map(|p| p.percent)
            .collect()
    }

    pub fn logs(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                InstallerEvent::Log(line) => Some(line.text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: InstallerEvent) {
        self.events.lock().push(event);
    }
}

/// Settings with only a folder-listing fallback and an unreachable object store.
pub fn fallback_settings(root: &Path, programs_url: &str, launcher_url: &str, health: &str) -> InstallerSettings {
    let mut settings = InstallerSettings::with_install_root(root);
    settings.server_port = 0;
    settings.healthcheck_url = health.to_string();
    settings.internet_probe_url = health.to_string();
    settings.request_timeout_secs = Some(5);
    let endpoints = EndpointSet {
        object_storage: Some(ObjectStorageEndpoints {
            programs_bucket_url: format!("{health}/programs"),
            launcher_host_url: format!("{health}/launcher"),
            launcher_bucket: "leadme-launcher".into(),
        }),
        folder_listing: Some(FolderListingEndpoints {
            programs_url: programs_url.to_string(),
            launcher_url: launcher_url.to_string(),
        }),
    };
    settings.production = endpoints.clone();
    settings.development = endpoints;
    settings
}

/// Build a zip in memory from `(name, contents, unix_mode)` entries.
/// Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents, mode) in entries {
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(*mode);
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(contents).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}
