use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::downloader::DownloadTask;
use crate::core::error::{LauncherError, LauncherResult};

/// How an acquired artifact is applied to the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Lands directly in the game directory (jars, libraries, assets).
    #[default]
    File,
    /// Zip archive extracted into the instance root.
    Archive,
    /// Loader installer run as a subprocess.
    Installer,
}

/// One file a request needs, as returned by the version resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub url: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    /// Relative to the game directory for files, or to the artifact store
    /// for archives and installers.
    pub relative_path: PathBuf,
    #[serde(default)]
    pub kind: ArtifactKind,
    #[serde(default)]
    pub priority: i32,
}

impl ArtifactDescriptor {
    pub fn file(url: impl Into<String>, relative_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            digest: None,
            size: None,
            relative_path: relative_path.into(),
            kind: ArtifactKind::File,
            priority: 0,
        }
    }

    pub fn with_kind(mut self, kind: ArtifactKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_digest(mut self, digest: Option<String>) -> Self {
        self.digest = digest;
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Rejects paths that are empty, absolute, or step outside their base
    /// directory.
    pub fn check_relative_path(&self) -> LauncherResult<()> {
        let mut components = self.relative_path.components().peekable();
        let plain = components.peek().is_some()
            && components.all(|c| matches!(c, Component::Normal(_)));
        if plain {
            Ok(())
        } else {
            Err(LauncherError::Resolution(format!(
                "Artifact {} has an unsafe path {:?}",
                self.url, self.relative_path
            )))
        }
    }

    /// Location relative to the instance root.
    pub fn instance_relative_path(&self, game_dir_name: &str, store_dir_name: &str) -> PathBuf {
        let base = match self.kind {
            ArtifactKind::File => game_dir_name,
            ArtifactKind::Archive | ArtifactKind::Installer => store_dir_name,
        };
        Path::new(base).join(&self.relative_path)
    }

    pub fn to_task(&self, destination: PathBuf) -> DownloadTask {
        let name = self
            .relative_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.url.clone());

        DownloadTask::new(self.url.clone(), destination)
            .with_name(name)
            .with_digest(self.digest.clone())
            .with_size(self.size)
            .with_priority(self.priority)
    }
}
