mod common;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::Query, http::header, response::IntoResponse, routing::get, Router};

use common::{spawn_upstream, RecordingSink};
use offline_installer_lib::core::downloader::bucket::fetch_bucket_tree;
use offline_installer_lib::core::downloader::Downloader;
use offline_installer_lib::core::http::build_http_client;
use offline_installer_lib::core::transport::BackendConfig;
use offline_installer_lib::{InstallerError, Reporter};

fn page(keys: &[&str], next: Option<&str>) -> String {
    let contents: String = keys
        .iter()
        .map(|key| format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"))
        .collect();
    let truncation = match next {
        Some(token) => format!(
            "<IsTruncated>true</IsTruncated><NextContinuationToken>{token}</NextContinuationToken>"
        ),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>tools</Name>{truncation}{contents}</ListBucketResult>"#
    )
}

async fn list(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    assert_eq!(params.get("list-type").map(String::as_str), Some("2"));
    let prefix = params.get("prefix").cloned().unwrap_or_default();
    let body = match (prefix.as_str(), params.get("continuation-token")) {
        ("leadme-launcher/", None) => page(
            &[
                "leadme-launcher/latest.yml",
                "leadme-launcher/win-unpacked/",
                "leadme-launcher/win-unpacked/LeadMe.exe",
            ],
            Some("page-2"),
        ),
        ("leadme-launcher/", Some(_)) => page(&["leadme-launcher/app.js"], None),
        ("broken-launcher/", _) => page(&["broken-launcher/app.js"], None),
        _ => page(&[], None),
    };
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

async fn object_store() -> String {
    let app = Router::new()
        .route("/", get(list))
        .route(
            "/leadme-launcher/latest.yml",
            get(|| async { "version: 5.0.2\nfiles: []\n" }),
        )
        .route("/leadme-launcher/win-unpacked/LeadMe.exe", get(|| async { "MZ" }))
        .route("/leadme-launcher/app.js", get(|| async { "app" }))
        .route("/broken-launcher/latest.yml", get(|| async { "files: []\n" }))
        .route("/broken-launcher/app.js", get(|| async { "app" }));
    spawn_upstream(app).await
}

fn downloader(sink: &RecordingSink) -> Downloader {
    Downloader::new(
        build_http_client(None).unwrap(),
        Reporter::new(Arc::new(sink.clone())),
    )
}

#[tokio::test]
async fn bucket_tree_follows_pagination_and_reports_item_progress() {
    let host = object_store().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("electron-launcher");
    let sink = RecordingSink::new();
    let backend = BackendConfig::object_storage(&host, Some("leadme-launcher".into()));

    let stats = fetch_bucket_tree(&downloader(&sink), &backend, "launcher", &dest)
        .await
        .unwrap();

    assert_eq!(stats.files, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(std::fs::read_to_string(dest.join("win-unpacked/LeadMe.exe")).unwrap(), "MZ");
    assert_eq!(std::fs::read_to_string(dest.join("app.js")).unwrap(), "app");
    assert_eq!(sink.progress_for("electron-launcher"), vec![50.0, 100.0]);
    assert!(sink
        .logs()
        .contains(&"File downloaded successfully 2 of 2.".to_string()));
}

#[tokio::test]
async fn unreadable_latest_yml_aborts_before_listing() {
    let host = object_store().await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("electron-launcher");
    let sink = RecordingSink::new();
    let backend = BackendConfig::object_storage(&host, Some("broken-launcher".into()));

    let err = fetch_bucket_tree(&downloader(&sink), &backend, "launcher", &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, InstallerError::MalformedData(_)));
    assert!(!dest.join("app.js").exists());
    assert!(sink.progress().is_empty());
}
