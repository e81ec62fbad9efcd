use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::downloader::DownloadConfig;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::DEFAULT_MAX_REDIRECTS;
use crate::core::install::ModpackSource;

pub const APP_DIR_NAME: &str = "InterfaceInstaller";
pub const SETTINGS_FILE: &str = "settings.json";

/// User-editable installer configuration, persisted as `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSettings {
    pub download: DownloadConfig,
    /// Java used to run loader installers.
    pub java_path: String,
    /// Wall-clock limit for installer subprocesses.
    pub installer_timeout_secs: Option<u64>,
    pub max_redirects: usize,
    /// Serve artifacts from a local mirror instead of the network.
    pub mirror_dir: Option<PathBuf>,
    pub modpacks: HashMap<String, ModpackSource>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            download: DownloadConfig::default(),
            java_path: "java".to_string(),
            installer_timeout_secs: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            mirror_dir: None,
            modpacks: HashMap::new(),
        }
    }
}

impl InstallerSettings {
    /// Read `settings.json` from `data_dir`, falling back to defaults when
    /// the file is missing or unreadable.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Cannot read {:?}, using defaults: {}", path, e);
                return Self::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Corrupt settings at {:?}, using defaults: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, data_dir: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_dir).map_err(LauncherError::io(data_dir))?;
        let path = data_dir.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(LauncherError::io(&path))
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
