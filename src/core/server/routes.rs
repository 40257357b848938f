use std::path::{Component, Path, PathBuf};

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::core::manifest::artifact::LAUNCHER_DIR;
use crate::core::manifest::{ArtifactDescriptor, MANIFEST};
use crate::core::progress::Reporter;
use crate::core::version::{ArtifactVersion, VersionMap};

pub const STATIC_LAUNCHER_PREFIX: &str = "/static/electron-launcher";
/// Bytes per body frame when streaming files.
pub const SERVE_CHUNK_SIZE: usize = 32 * 1024;

/// Read-only view of the artifact store handed to every request.
#[derive(Clone)]
pub struct ServeState {
    pub programs_dir: PathBuf,
    pub versions: VersionMap,
    pub reporter: Reporter,
}

/// Paths are matched case-insensitively, so everything goes through one
/// dispatcher instead of axum's (case-sensitive) route table.
pub fn router(state: ServeState) -> Router {
    Router::new().fallback(dispatch).with_state(state)
}

#[derive(Debug, PartialEq, Eq)]
enum Route {
    Root,
    Program(&'static ArtifactDescriptor),
    ProgramVersion(&'static ArtifactDescriptor),
    LauncherFile,
    NotFound,
}

/// Classify an already lowercased request path.
fn parse_route(path: &str) -> Route {
    if path == "/" {
        return Route::Root;
    }
    if path.starts_with(STATIC_LAUNCHER_PREFIX) {
        return Route::LauncherFile;
    }

    for artifact in MANIFEST.iter() {
        let name = artifact.name;
        if let Some(rest) = path.strip_prefix("/program-") {
            if rest == name {
                return Route::Program(artifact);
            }
            if rest.strip_suffix("-version") == Some(name) {
                return Route::ProgramVersion(artifact);
            }
        }
        if let Some(rest) = path
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix(name))
            .and_then(|p| p.strip_prefix('/'))
        {
            if rest == "version" {
                return Route::ProgramVersion(artifact);
            }
            if rest.strip_suffix(".zip") == Some(name) {
                return Route::Program(artifact);
            }
        }
    }

    Route::NotFound
}

async fn dispatch(State(state): State<ServeState>, uri: Uri) -> Response {
    let path = uri.path();
    let lowered = path.to_ascii_lowercase();
    debug!("Request for {}", path);

    match parse_route(&lowered) {
        Route::Root => (StatusCode::OK, "Hello, World!").into_response(),
        Route::Program(artifact) => {
            state
                .reporter
                .log(format!("{} file being served.", artifact.display_name()));
            let file = artifact.archive_path(&state.programs_dir);
            serve_file(
                &file,
                "application/octet-stream",
                Some(artifact.archive_file),
            )
            .await
        }
        Route::ProgramVersion(artifact) => {
            state.reporter.log(format!(
                "{} version being checked.",
                artifact.display_name()
            ));
            serve_version(&state.versions, artifact)
        }
        Route::LauncherFile => {
            state.reporter.log("Electron file being served.");
            let relative = &path[STATIC_LAUNCHER_PREFIX.len()..];
            match launcher_file_path(&state.programs_dir, relative) {
                Some(file) => serve_file(&file, mime_for_path(&file), None).await,
                None => not_found(),
            }
        }
        Route::NotFound => not_found(),
    }
}

fn serve_version(versions: &VersionMap, artifact: &ArtifactDescriptor) -> Response {
    match versions.get(artifact.name) {
        Some(ArtifactVersion::Known(version)) if !version.trim().is_empty() => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{} {}", version, artifact.name),
        )
            .into_response(),
        _ => not_found(),
    }
}

/// Resolve a request suffix below the launcher directory.
///
/// `None` for anything that would leave the directory or names no file.
fn launcher_file_path(programs_dir: &Path, raw_suffix: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(raw_suffix).ok()?;
    let mut file = programs_dir.join(LAUNCHER_DIR);
    let mut has_component = false;
    for part in decoded.split('/').filter(|part| !part.is_empty()) {
        if !is_plain_component(part) {
            warn!("Rejected static path {:?}", raw_suffix);
            return None;
        }
        file.push(part);
        has_component = true;
    }
    has_component.then_some(file)
}

/// One ordinary file or directory name on every platform.
fn is_plain_component(part: &str) -> bool {
    if part.contains(['\\', ':']) {
        return false;
    }
    let mut components = Path::new(part).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "yml" => "text/yaml",
        "blockmap" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Stream a file with an exact `Content-Length`, or 404 if it is missing.
async fn serve_file(path: &Path, content_type: &str, attachment: Option<&str>) -> Response {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return not_found(),
    };
    let length = match file.metadata().await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => return not_found(),
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length);
    if let Some(name) = attachment {
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        );
    }

    let body = Body::from_stream(ReaderStream::with_capacity(file, SERVE_CHUNK_SIZE));
    match builder.body(body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Could not build response for {:?}: {}", path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 Not Found").into_response()
}
