use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ModLoaderKind;

/// What an install request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallTarget {
    GameVersion,
    ModLoader,
    Modpack,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSpec {
    pub kind: ModLoaderKind,
    pub version: String,
}

/// Immutable description of one install.
///
/// `version_id` is the Minecraft version for game-version and mod-loader
/// targets, and the catalog id for modpacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub target: InstallTarget,
    pub version_id: String,
    #[serde(default)]
    pub loader: Option<LoaderSpec>,
    pub instance_dir: PathBuf,
}

impl InstallRequest {
    pub fn game_version(version_id: impl Into<String>, instance_dir: impl Into<PathBuf>) -> Self {
        Self {
            target: InstallTarget::GameVersion,
            version_id: version_id.into(),
            loader: None,
            instance_dir: instance_dir.into(),
        }
    }

    pub fn mod_loader(
        minecraft_version: impl Into<String>,
        kind: ModLoaderKind,
        loader_version: impl Into<String>,
        instance_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            target: InstallTarget::ModLoader,
            version_id: minecraft_version.into(),
            loader: Some(LoaderSpec {
                kind,
                version: loader_version.into(),
            }),
            instance_dir: instance_dir.into(),
        }
    }

    pub fn modpack(pack_id: impl Into<String>, instance_dir: impl Into<PathBuf>) -> Self {
        Self {
            target: InstallTarget::Modpack,
            version_id: pack_id.into(),
            loader: None,
            instance_dir: instance_dir.into(),
        }
    }

    /// The instance directory's final component.
    pub fn instance_id(&self) -> String {
        self.instance_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.instance_dir.to_string_lossy().to_string())
    }

    pub fn instance_dir(&self) -> &Path {
        &self.instance_dir
    }

    /// Structural checks that need no network.
    pub fn check(&self) -> LauncherResult<()> {
        if self.version_id.trim().is_empty() {
            return Err(LauncherError::Resolution("Empty version id".into()));
        }
        match (&self.target, &self.loader) {
            (InstallTarget::ModLoader, None) => Err(LauncherError::Resolution(
                "Mod-loader install requires a loader kind and version".into(),
            )),
            (InstallTarget::ModLoader, Some(spec))
                if spec.kind != ModLoaderKind::Vanilla && spec.version.trim().is_empty() =>
            {
                Err(LauncherError::Resolution(format!(
                    "Missing {} loader version",
                    spec.kind
                )))
            }
            _ => Ok(()),
        }
    }
}
