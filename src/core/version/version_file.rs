// ─── Version File ───
// Parses a Mojang version JSON and turns it into the artifacts a game
// version needs, evaluating OS rules for libraries.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use crate::core::install::{ArtifactDescriptor, ArtifactKind};
use crate::core::maven::{MavenArtifact, MOJANG_LIBRARIES};

/// Claim-order hints: metadata first, then the client, libraries, assets.
pub const PRIORITY_METADATA: i32 = 10;
pub const PRIORITY_CLIENT: i32 = 5;
pub const PRIORITY_LIBRARY: i32 = 0;
pub const PRIORITY_ASSET: i32 = -1;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
}

#[derive(Debug, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    pub size: u64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    /// Repository base for libraries without explicit downloads.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<LibraryRule>>,
    #[serde(default)]
    pub natives: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    pub sha1: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
}

impl LibraryEntry {
    /// Mojang rule semantics: no rules means allowed; otherwise start from
    /// "disallowed" and let the last matching rule decide.
    pub fn is_allowed_for_current_os(&self) -> bool {
        let Some(rules) = &self.rules else {
            return true;
        };

        let current_os = current_os_name();
        let mut allowed = false;
        for rule in rules {
            let os_matches = rule
                .os
                .as_ref()
                .and_then(|os| os.name.as_deref())
                .map_or(true, |name| name == current_os);
            if os_matches {
                allowed = rule.action == RuleAction::Allow;
            }
        }
        allowed
    }

    pub fn native_classifier_for_current_os(&self) -> Option<String> {
        let natives = self.natives.as_ref()?;
        natives
            .as_object()?
            .get(current_os_name())?
            .as_str()
            .map(|s| {
                let arch = if cfg!(target_pointer_width = "64") {
                    "64"
                } else {
                    "32"
                };
                s.replace("${arch}", arch)
            })
    }

    fn artifacts(&self) -> Vec<ArtifactDescriptor> {
        let mut out = Vec::new();

        match self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            Some(artifact) => out.push(library_descriptor(
                &artifact.url,
                &artifact.path,
                Some(artifact.sha1.clone()),
                artifact.size,
            )),
            None if self.downloads.is_none() => {
                // Loader-style entry: only a coordinate and maybe a repo.
                if let Ok(coord) = MavenArtifact::parse(&self.name) {
                    let repo = self.url.as_deref().unwrap_or(MOJANG_LIBRARIES);
                    out.push(library_descriptor(
                        &coord.url(repo),
                        &coord.local_path().to_string_lossy(),
                        None,
                        None,
                    ));
                }
            }
            None => {}
        }

        if let Some(classifier) = self.native_classifier_for_current_os() {
            let native = self
                .downloads
                .as_ref()
                .and_then(|d| d.classifiers.as_ref())
                .and_then(|c| c.get(&classifier));
            if let Some(native) = native {
                let field = |key: &str| native.get(key).and_then(|v| v.as_str());
                if let (Some(url), Some(path)) = (field("url"), field("path")) {
                    out.push(library_descriptor(
                        url,
                        path,
                        field("sha1").map(str::to_string),
                        native.get("size").and_then(|v| v.as_u64()),
                    ));
                }
            }
        }

        out
    }
}

fn library_descriptor(
    url: &str,
    path: &str,
    sha1: Option<String>,
    size: Option<u64>,
) -> ArtifactDescriptor {
    ArtifactDescriptor::file(url, PathBuf::from("libraries").join(path))
        .with_digest(sha1)
        .with_size(size)
        .with_priority(PRIORITY_LIBRARY)
}

/// Get the Mojang OS name for the current platform.
fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

impl VersionJson {
    /// The version JSON itself, stored as `versions/<id>/<id>.json`.
    pub fn metadata_artifact(version_id: &str, url: &str, sha1: Option<String>) -> ArtifactDescriptor {
        ArtifactDescriptor::file(
            url,
            PathBuf::from("versions")
                .join(version_id)
                .join(format!("{}.json", version_id)),
        )
        .with_digest(sha1)
        .with_priority(PRIORITY_METADATA)
    }

    pub fn client_artifact(&self, version_id: &str) -> Option<ArtifactDescriptor> {
        let client = self.downloads.as_ref()?.client.as_ref()?;
        Some(
            ArtifactDescriptor::file(
                &client.url,
                PathBuf::from("versions")
                    .join(version_id)
                    .join(format!("{}.jar", version_id)),
            )
            .with_digest(Some(client.sha1.clone()))
            .with_size(Some(client.size))
            .with_priority(PRIORITY_CLIENT),
        )
    }

    /// Libraries allowed on this OS, natives included.
    pub fn library_artifacts(&self) -> Vec<ArtifactDescriptor> {
        let mut out = Vec::new();
        for lib in &self.libraries {
            if !lib.is_allowed_for_current_os() {
                debug!("Skipping library (OS rule): {}", lib.name);
                continue;
            }
            out.extend(lib.artifacts());
        }
        out
    }

    pub fn asset_index_artifact(&self) -> Option<ArtifactDescriptor> {
        let index = self.asset_index.as_ref()?;
        Some(
            ArtifactDescriptor::file(
                &index.url,
                PathBuf::from("assets")
                    .join("indexes")
                    .join(format!("{}.json", index.id)),
            )
            .with_digest(index.sha1.clone())
            .with_size(index.size)
            .with_kind(ArtifactKind::File)
            .with_priority(PRIORITY_METADATA),
        )
    }
}
