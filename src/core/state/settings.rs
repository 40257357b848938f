use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::{InstallerError, InstallerResult};

const APP_DIR_NAME: &str = "OfflineInstaller";
pub const SETTINGS_FILE: &str = "installer_settings.json";
pub const DEFAULT_SERVER_PORT: u16 = 8088;

/// Which family of remote buckets/hosts a batch pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    pub fn from_production_flag(is_production: bool) -> Self {
        if is_production {
            Mode::Production
        } else {
            Mode::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Production => "production",
            Mode::Development => "development",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectStorageEndpoints {
    /// Bucket holding `<Stem>/<Stem>.zip` program archives.
    pub programs_bucket_url: String,
    /// S3 host holding the launcher bucket.
    pub launcher_host_url: String,
    /// Bucket (key prefix) of the launcher tree on `launcher_host_url`.
    pub launcher_bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderListingEndpoints {
    /// Host answering `GET /program-<artifact>`.
    pub programs_url: String,
    /// Host answering `GET /download-folder` with JSON listings.
    pub launcher_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointSet {
    #[serde(default)]
    pub object_storage: Option<ObjectStorageEndpoints>,
    #[serde(default)]
    pub folder_listing: Option<FolderListingEndpoints>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallerSettings {
    pub install_root: PathBuf,
    #[serde(default = "default_port")]
    pub server_port: u16,
    pub healthcheck_url: String,
    pub internet_probe_url: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub production: EndpointSet,
    #[serde(default)]
    pub development: EndpointSet,
}

fn default_port() -> u16 {
    DEFAULT_SERVER_PORT
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            server_port: DEFAULT_SERVER_PORT,
            healthcheck_url: "https://leadme-healthcheck.sgp1.vultrobjects.com/healthcheck".into(),
            internet_probe_url: "https://herokuapp.com".into(),
            request_timeout_secs: Some(15),
            production: EndpointSet {
                object_storage: Some(ObjectStorageEndpoints {
                    programs_bucket_url: "https://leadme-internal.sgp1.vultrobjects.com".into(),
                    launcher_host_url: "https://leadme-tools.sgp1.vultrobjects.com".into(),
                    launcher_bucket: "leadme-launcher".into(),
                }),
                folder_listing: Some(FolderListingEndpoints {
                    programs_url: "https://learninglablauncher.herokuapp.com".into(),
                    launcher_url: "https://electronlauncher.herokuapp.com".into(),
                }),
            },
            development: EndpointSet {
                object_storage: Some(ObjectStorageEndpoints {
                    programs_bucket_url: "https://leadme-internal-debug.sgp1.vultrobjects.com"
                        .into(),
                    launcher_host_url: "https://leadme-tools.sgp1.vultrobjects.com".into(),
                    launcher_bucket: "leadme-launcher-debug".into(),
                }),
                folder_listing: Some(FolderListingEndpoints {
                    programs_url: "https://learninglablauncherdevelopment.herokuapp.com".into(),
                    launcher_url: "https://leadme-launcher-development-92514d5e709f.herokuapp.com"
                        .into(),
                }),
            },
        }
    }
}

impl InstallerSettings {
    /// Settings rooted at `install_root` with the stock endpoints.
    pub fn with_install_root(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> InstallerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| InstallerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&raw)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring unreadable settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> InstallerResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| InstallerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn endpoints(&self, mode: Mode) -> &EndpointSet {
        match mode {
            Mode::Production => &self.production,
            Mode::Development => &self.development,
        }
    }

    /// `<install-root>/_programs`, the on-disk artifact store.
    pub fn programs_dir(&self) -> PathBuf {
        self.install_root.join("_programs")
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

pub fn default_settings_path() -> PathBuf {
    default_install_root().join(SETTINGS_FILE)
}

fn default_install_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
