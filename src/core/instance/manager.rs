use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::layout;
use super::model::{
    manifest_path, InstallManifest, ManifestArtifact, ValidationStatus, MANIFEST_TMP_FILE,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::integrity;

/// Result of an uninstall request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UninstallOutcome {
    Removed,
    /// The instance directory did not exist.
    NothingToDo,
}

/// Owns instance directories under one root: layout, manifests, removal.
pub struct InstanceManager {
    /// Root directory where all instances live.
    instances_dir: PathBuf,
}

impl InstanceManager {
    pub fn new(instances_dir: PathBuf) -> Self {
        Self { instances_dir }
    }

    pub fn instances_dir(&self) -> &Path {
        &self.instances_dir
    }

    /// Directory of instance `id`. The id must be a single plain path
    /// component, so the result always stays under `instances_dir`.
    pub fn instance_path(&self, id: &str) -> LauncherResult<PathBuf> {
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == id => {
                Ok(self.instances_dir.join(name))
            }
            _ => Err(LauncherError::InvalidInstanceId(id.to_string())),
        }
    }

    // ── Layout ──────────────────────────────────────────

    /// Idempotent layout repair; see [`layout::normalize`].
    pub async fn normalize(&self, instance_root: &Path) -> LauncherResult<usize> {
        let root = instance_root.to_path_buf();
        tokio::task::spawn_blocking(move || layout::normalize(&root))
            .await
            .map_err(|e| LauncherError::Other(format!("Normalize task panicked: {}", e)))?
    }

    // ── Manifest ────────────────────────────────────────

    /// `None` when the instance has no manifest, or an unreadable one.
    pub async fn load_manifest(&self, instance_root: &Path) -> LauncherResult<Option<InstallManifest>> {
        let path = manifest_path(instance_root);
        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LauncherError::Io { path, source: e }),
        };

        match serde_json::from_str(&json) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(e) => {
                warn!("Corrupt manifest at {:?}: {}", path, e);
                Ok(None)
            }
        }
    }

    /// Write the manifest through a temp file and rename it into place.
    pub async fn save_manifest(
        &self,
        instance_root: &Path,
        manifest: &InstallManifest,
    ) -> LauncherResult<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        let tmp = instance_root.join(MANIFEST_TMP_FILE);
        let path = manifest_path(instance_root);

        tokio::fs::create_dir_all(instance_root)
            .await
            .map_err(LauncherError::io(instance_root))?;
        tokio::fs::write(&tmp, json)
            .await
            .map_err(LauncherError::io(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(LauncherError::io(&path))?;

        Ok(())
    }

    pub async fn remove_manifest(&self, instance_root: &Path) -> LauncherResult<()> {
        let path = manifest_path(instance_root);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LauncherError::Io { path, source: e }),
        }
    }

    /// Check that every artifact exists and matches its declared digest.
    pub async fn check_artifacts(
        &self,
        instance_root: &Path,
        artifacts: &[ManifestArtifact],
    ) -> LauncherResult<ValidationStatus> {
        let mut missing = Vec::new();
        let mut corrupt = Vec::new();

        for artifact in artifacts {
            let path = instance_root.join(&artifact.path);
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(m) if m.is_file() => m,
                _ => {
                    missing.push(artifact.path.clone());
                    continue;
                }
            };

            let size_ok = artifact.size.map_or(true, |size| size == metadata.len());
            let digest_ok = match integrity::verify(&path, artifact.digest.as_deref()).await {
                Ok(ok) => ok,
                Err(LauncherError::Io { .. }) => false,
                Err(e) => return Err(e),
            };
            if !size_ok || !digest_ok {
                corrupt.push(artifact.path.clone());
            }
        }

        if missing.is_empty() && corrupt.is_empty() {
            Ok(ValidationStatus::Valid)
        } else {
            Ok(ValidationStatus::Invalid { missing, corrupt })
        }
    }

    // ── Queries ─────────────────────────────────────────

    /// Manifests of every installed instance, sorted by id.
    pub async fn list_installed(&self) -> LauncherResult<Vec<InstallManifest>> {
        let mut manifests = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.instances_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(manifests),
            Err(e) => {
                return Err(LauncherError::Io {
                    path: self.instances_dir.clone(),
                    source: e,
                })
            }
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(LauncherError::io(&self.instances_dir))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(manifest) = self.load_manifest(&path).await? {
                manifests.push(manifest);
            }
        }

        manifests.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(manifests)
    }

    /// Re-verify an installed instance and persist the result.
    pub async fn validate(&self, id: &str) -> LauncherResult<InstallManifest> {
        let root = self.instance_path(id)?;
        let mut manifest = self
            .load_manifest(&root)
            .await?
            .ok_or_else(|| LauncherError::InstanceNotFound(id.to_string()))?;

        manifest.validation = self.check_artifacts(&root, &manifest.artifacts).await?;
        manifest.last_validated_at = Some(Utc::now());
        self.save_manifest(&root, &manifest).await?;

        if !manifest.validation.is_valid() {
            warn!(instance = %id, status = ?manifest.validation, "Instance failed validation");
        }
        Ok(manifest)
    }

    // ── Removal ─────────────────────────────────────────

    /// Delete an instance from disk.
    pub async fn uninstall(&self, id: &str) -> LauncherResult<UninstallOutcome> {
        let instance_dir = self.instance_path(id)?;
        if !instance_dir.exists() {
            info!("Instance {} not present, nothing to uninstall", id);
            return Ok(UninstallOutcome::NothingToDo);
        }

        tokio::fs::remove_dir_all(&instance_dir)
            .await
            .map_err(LauncherError::io(&instance_dir))?;

        info!("Uninstalled instance {}", id);
        Ok(UninstallOutcome::Removed)
    }
}
