mod common;

use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;

use common::{spawn_upstream, RecordingSink};
use offline_installer_lib::core::downloader::{Downloader, FolderFetcher};
use offline_installer_lib::core::http::build_http_client;
use offline_installer_lib::{InstallerError, Reporter};

async fn launcher_host() -> String {
    let app = Router::new()
        .route(
            "/download-folder",
            get(|| async {
                Json(json!([
                    {"type": "file", "name": "latest.yml"},
                    {"type": "folder"},
                    {"type": "folder", "name": "win-unpacked"},
                    {"type": "folder", "name": "broken"},
                    {"kind": "file", "name": "ignored.txt"},
                    {"type": "file", "name": "app.js"}
                ]))
            }),
        )
        .route(
            "/download-folder/latest.yml",
            get(|| async { "version: 3.1.4\npath: LeadMe Setup 3.1.4.exe\n" }),
        )
        .route("/download-folder/app.js", get(|| async { "console.log(1);" }))
        .route(
            "/download-folder/win-unpacked",
            get(|| async {
                Json(json!([
                    {"type": "file", "name": "a.txt"},
                    {"type": "symlink", "name": "current"},
                    {"type": "folder", "name": "resources"}
                ]))
            }),
        )
        .route("/download-folder/win-unpacked/a.txt", get(|| async { "a" }))
        .route(
            "/download-folder/win-unpacked/resources",
            get(|| async { Json(json!([{"type": "file", "name": "app.asar"}])) }),
        )
        .route(
            "/download-folder/win-unpacked/resources/app.asar",
            get(|| async { vec![1_u8; 4096] }),
        )
        .route(
            "/download-folder/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
    spawn_upstream(app).await
}

fn downloader(sink: &RecordingSink) -> Downloader {
    Downloader::new(
        build_http_client(None).unwrap(),
        Reporter::new(Arc::new(sink.clone())),
    )
}

#[tokio::test]
async fn tree_is_mirrored_with_per_level_progress() {
    let base = launcher_host().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("electron-launcher");
    let sink = RecordingSink::new();
    let downloader = downloader(&sink);

    let stats = FolderFetcher::new(&downloader, "launcher")
        .fetch_tree(&format!("{base}/download-folder"), &dest, "electron-launcher")
        .await
        .unwrap();

    // Four files arrived, the broken subtree counts as one failure.
    assert_eq!(stats.files, 4);
    assert_eq!(stats.failed, 1);

    assert_eq!(
        std::fs::read_to_string(dest.join("latest.yml")).unwrap(),
        "version: 3.1.4\npath: LeadMe Setup 3.1.4.exe\n"
    );
    assert_eq!(std::fs::read_to_string(dest.join("app.js")).unwrap(), "console.log(1);");
    assert_eq!(
        std::fs::read(dest.join("win-unpacked/resources/app.asar")).unwrap().len(),
        4096
    );
    assert!(!dest.join("ignored.txt").exists());
    assert!(!dest.join("broken").exists());

    // Six raw entries of which two are malformed, so the root stops short of 100.
    assert_eq!(
        sink.progress_for("electron-launcher"),
        vec![16.67, 33.33, 50.0, 66.67]
    );
    // An unsupported type is counted but not fetched.
    assert!(!dest.join("win-unpacked/current").exists());
    assert_eq!(
        sink.progress_for("electron-launcher/win-unpacked"),
        vec![33.33, 66.67, 100.0]
    );
    assert_eq!(
        sink.progress_for("electron-launcher/win-unpacked/resources"),
        vec![100.0]
    );
    assert!(sink
        .logs()
        .iter()
        .any(|line| line.contains("broken")));
}

#[tokio::test]
async fn fetch_folder_nests_under_the_folder_name() {
    let base = launcher_host().await;
    let dir = tempfile::tempdir().unwrap();
    let sink = RecordingSink::new();
    let downloader = downloader(&sink);

    let stats = FolderFetcher::new(&downloader, "launcher")
        .fetch_folder(&format!("{base}/download-folder"), "win-unpacked", dir.path())
        .await
        .unwrap();

    assert_eq!(stats.files, 2);
    assert_eq!(stats.failed, 0);
    assert!(dir.path().join("win-unpacked/a.txt").exists());
    assert_eq!(sink.progress_for("win-unpacked"), vec![33.33, 66.67, 100.0]);
}

#[tokio::test]
async fn failing_root_listing_aborts_the_tree() {
    let base = launcher_host().await;
    let dir = tempfile::tempdir().unwrap();
    let sink = RecordingSink::new();
    let downloader = downloader(&sink);

    let err = FolderFetcher::new(&downloader, "launcher")
        .fetch_tree(&format!("{base}/download-folder/broken"), dir.path(), "broken")
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::DownloadFailed { status: 500, .. }));
    assert!(sink.progress().is_empty());
}
