use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::install::{ArtifactDescriptor, ArtifactKind, InstallRequest, InstallTarget, LoaderSpec};

/// Supported mod loaders — strongly typed, no magic strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModLoaderKind {
    Vanilla,
    Forge,
    Fabric,
    Quilt,
    NeoForge,
}

impl std::fmt::Display for ModLoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModLoaderKind::Vanilla => write!(f, "vanilla"),
            ModLoaderKind::Forge => write!(f, "forge"),
            ModLoaderKind::Fabric => write!(f, "fabric"),
            ModLoaderKind::Quilt => write!(f, "quilt"),
            ModLoaderKind::NeoForge => write!(f, "neoforge"),
        }
    }
}

// ─── Instance layout ───

/// Persisted install manifest, relative to the instance root.
pub const MANIFEST_FILE: &str = "instance.json";
pub const MANIFEST_TMP_FILE: &str = "instance.json.tmp";
/// Archives and installer jars kept for re-verification.
pub const ARTIFACT_STORE_DIR: &str = ".artifacts";
pub const LAUNCHER_PROFILES_FILE: &str = "launcher_profiles.json";
/// Canonical game root inside the instance.
pub const GAME_DIR: &str = "minecraft";
/// Name some archives use for the game root; merged into [`GAME_DIR`].
pub const GAME_DIR_ALIAS: &str = ".minecraft";
pub const CANONICAL_SUBDIRS: [&str; 6] =
    ["mods", "config", "resourcepacks", "shaderpacks", "saves", "logs"];

/// Entries that stay at the instance root during normalization.
pub fn is_bookkeeping(name: &str) -> bool {
    matches!(
        name,
        MANIFEST_FILE | MANIFEST_TMP_FILE | ARTIFACT_STORE_DIR | LAUNCHER_PROFILES_FILE
    )
}

pub fn game_dir(instance_root: &Path) -> PathBuf {
    instance_root.join(GAME_DIR)
}

pub fn artifact_store_dir(instance_root: &Path) -> PathBuf {
    instance_root.join(ARTIFACT_STORE_DIR)
}

pub fn manifest_path(instance_root: &Path) -> PathBuf {
    instance_root.join(MANIFEST_FILE)
}

// ─── Manifest ───

/// Result of the last on-disk check of a manifest's artifacts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    Unchecked,
    Valid,
    Invalid {
        #[serde(default)]
        missing: Vec<PathBuf>,
        #[serde(default)]
        corrupt: Vec<PathBuf>,
    },
}

impl ValidationStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationStatus::Valid)
    }
}

/// Identity of one installed artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestArtifact {
    /// Relative to the instance root.
    pub path: PathBuf,
    pub url: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub kind: ArtifactKind,
}

impl ManifestArtifact {
    pub fn from_descriptor(descriptor: &ArtifactDescriptor) -> Self {
        Self {
            path: descriptor.instance_relative_path(GAME_DIR, ARTIFACT_STORE_DIR),
            url: descriptor.url.clone(),
            digest: descriptor.digest.clone(),
            size: descriptor.size,
            kind: descriptor.kind,
        }
    }
}

/// Durable record of a successful install, persisted as `instance.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallManifest {
    pub instance_id: String,
    pub target: InstallTarget,
    pub version_id: String,
    #[serde(default)]
    pub loader: Option<LoaderSpec>,
    pub artifacts: Vec<ManifestArtifact>,
    pub installed_at: DateTime<Utc>,
    #[serde(default)]
    pub validation: ValidationStatus,
    #[serde(default)]
    pub last_validated_at: Option<DateTime<Utc>>,
}

impl InstallManifest {
    pub fn new(request: &InstallRequest, artifacts: Vec<ManifestArtifact>) -> Self {
        let now = Utc::now();
        Self {
            instance_id: request.instance_id(),
            target: request.target,
            version_id: request.version_id.clone(),
            loader: request.loader.clone(),
            artifacts,
            installed_at: now,
            validation: ValidationStatus::Valid,
            last_validated_at: Some(now),
        }
    }

    pub fn loader_kind(&self) -> ModLoaderKind {
        self.loader
            .as_ref()
            .map_or(ModLoaderKind::Vanilla, |l| l.kind)
    }

    /// Same request and the same artifact identities (order-insensitive).
    pub fn matches(&self, request: &InstallRequest, artifacts: &[ManifestArtifact]) -> bool {
        if self.target != request.target
            || self.version_id != request.version_id
            || self.loader != request.loader
            || self.artifacts.len() != artifacts.len()
        {
            return false;
        }
        artifacts.iter().all(|a| self.artifacts.contains(a))
    }
}
