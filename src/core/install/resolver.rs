use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::artifact::{ArtifactDescriptor, ArtifactKind};
use super::request::{InstallRequest, InstallTarget, LoaderSpec};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::ModLoaderKind;
use crate::core::loaders::Installer;
use crate::core::version::version_file::PRIORITY_METADATA;
use crate::core::version::{AssetIndex, VersionJson, VersionManifest, VERSION_MANIFEST_URL};

/// Modpack archives are stored under `.artifacts/modpacks/`.
pub const MODPACKS_DIR: &str = "modpacks";

/// One entry of the static modpack catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackSource {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    pub minecraft_version: String,
    #[serde(default)]
    pub loader: Option<LoaderSpec>,
}

/// What a request turned into: the game version and loader to set up, and
/// every artifact that has to be on disk afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstall {
    pub minecraft_version: String,
    pub loader: Option<LoaderSpec>,
    pub artifacts: Vec<ArtifactDescriptor>,
}

impl ResolvedInstall {
    /// The loader whose installer has to run, if any.
    pub fn installer_loader(&self) -> Option<&LoaderSpec> {
        self.loader
            .as_ref()
            .filter(|spec| spec.kind != ModLoaderKind::Vanilla)
    }
}

/// Turns a request into concrete artifacts. Must not touch the instance.
#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve(&self, request: &InstallRequest) -> LauncherResult<ResolvedInstall>;
}

/// Resolves against Mojang piston-meta, loader Maven repositories and the
/// configured modpack catalog.
pub struct MetaResolver {
    client: reqwest::Client,
    manifest_url: String,
    maven_mirror: Option<String>,
    include_assets: bool,
    modpacks: HashMap<String, ModpackSource>,
}

impl MetaResolver {
    pub fn new(client: reqwest::Client, modpacks: HashMap<String, ModpackSource>) -> Self {
        Self {
            client,
            manifest_url: VERSION_MANIFEST_URL.to_string(),
            maven_mirror: None,
            include_assets: true,
            modpacks,
        }
    }

    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.manifest_url = url.into();
        self
    }

    /// Serve every Maven artifact from one repository base.
    pub fn with_maven_mirror(mut self, base: impl Into<String>) -> Self {
        self.maven_mirror = Some(base.into());
        self
    }

    /// Skip asset objects (sounds, textures).
    pub fn with_assets(mut self, include: bool) -> Self {
        self.include_assets = include;
        self
    }

    async fn get_text(&self, url: &str) -> LauncherResult<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    async fn game_artifacts(&self, minecraft_version: &str) -> LauncherResult<Vec<ArtifactDescriptor>> {
        let manifest = VersionManifest::fetch(&self.client, &self.manifest_url).await?;
        let entry = manifest.find_version(minecraft_version).ok_or_else(|| {
            LauncherError::Resolution(format!(
                "Minecraft version {} not found in manifest",
                minecraft_version
            ))
        })?;

        let version: VersionJson = serde_json::from_str(&self.get_text(&entry.url).await?)?;

        let mut artifacts = vec![VersionJson::metadata_artifact(
            minecraft_version,
            &entry.url,
            entry.sha1.clone(),
        )];
        artifacts.extend(version.client_artifact(minecraft_version));
        artifacts.extend(version.library_artifacts());

        if let Some(index) = version.asset_index_artifact() {
            if self.include_assets {
                let parsed = AssetIndex::parse(&self.get_text(&index.url).await?)?;
                artifacts.extend(parsed.object_artifacts()?);
            }
            artifacts.push(index);
        }

        debug!(version = %minecraft_version, count = artifacts.len(), "Resolved game artifacts");
        Ok(artifacts)
    }

    async fn loader_artifacts(
        &self,
        minecraft_version: &str,
        spec: &LoaderSpec,
    ) -> LauncherResult<Vec<ArtifactDescriptor>> {
        let installer = Installer::new(spec.kind);

        if let Some(probe) = installer.version_probe(minecraft_version, &spec.version) {
            let url = probe
                .artifact
                .url(self.maven_mirror.as_deref().unwrap_or(probe.repository));
            self.ensure_published(&url, spec, minecraft_version).await?;
        }

        Ok(installer
            .installer_descriptor(minecraft_version, &spec.version, self.maven_mirror.as_deref())
            .into_iter()
            .collect())
    }

    async fn ensure_published(
        &self,
        url: &str,
        spec: &LoaderSpec,
        minecraft_version: &str,
    ) -> LauncherResult<()> {
        let response = self.client.head(url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(LauncherError::Resolution(format!(
                "{} {} is not available for Minecraft {}",
                spec.kind, spec.version, minecraft_version
            ))),
            status => Err(LauncherError::LoaderApi(format!(
                "{} returned {} for {}",
                spec.kind, status, url
            ))),
        }
    }
}

#[async_trait]
impl VersionResolver for MetaResolver {
    async fn resolve(&self, request: &InstallRequest) -> LauncherResult<ResolvedInstall> {
        request.check()?;
        info!(target = ?request.target, version = %request.version_id, "Resolving install");

        let (minecraft_version, loader, archive) = match request.target {
            InstallTarget::GameVersion => (request.version_id.clone(), None, None),
            InstallTarget::ModLoader => (request.version_id.clone(), request.loader.clone(), None),
            InstallTarget::Modpack => {
                let pack = self.modpacks.get(&request.version_id).ok_or_else(|| {
                    LauncherError::Resolution(format!("Unknown modpack '{}'", request.version_id))
                })?;
                let archive = ArtifactDescriptor::file(
                    &pack.url,
                    PathBuf::from(MODPACKS_DIR).join(format!("{}.zip", request.version_id)),
                )
                .with_kind(ArtifactKind::Archive)
                .with_digest(pack.sha1.clone())
                .with_priority(PRIORITY_METADATA);
                (pack.minecraft_version.clone(), pack.loader.clone(), Some(archive))
            }
        };

        // Cheap loader check before the larger game metadata.
        let mut artifacts = match &loader {
            Some(spec) => self.loader_artifacts(&minecraft_version, spec).await?,
            None => Vec::new(),
        };
        artifacts.extend(archive);
        artifacts.extend(self.game_artifacts(&minecraft_version).await?);

        Ok(ResolvedInstall {
            minecraft_version,
            loader,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mojang(server: &mut mockito::Server) -> Vec<mockito::Mock> {
        let base = server.url();
        let manifest = serde_json::json!({
            "versions": [{
                "id": "1.20.4",
                "type": "release",
                "url": format!("{base}/v1/1.20.4.json"),
                "sha1": "1111111111111111111111111111111111111111"
            }]
        });
        let version = serde_json::json!({
            "id": "1.20.4",
            "downloads": {"client": {
                "sha1": "2222222222222222222222222222222222222222",
                "size": 3,
                "url": format!("{base}/client.jar")
            }},
            "assetIndex": {"id": "12", "url": format!("{base}/indexes/12.json")},
            "libraries": []
        });
        let index = serde_json::json!({"objects": {
            "a": {"hash": "3333333333333333333333333333333333333333", "size": 1}
        }});

        vec![
            server
                .mock("GET", "/manifest.json")
                .with_body(manifest.to_string())
                .create_async()
                .await,
            server
                .mock("GET", "/v1/1.20.4.json")
                .with_body(version.to_string())
                .create_async()
                .await,
            server
                .mock("GET", "/indexes/12.json")
                .with_body(index.to_string())
                .create_async()
                .await,
        ]
    }

    fn resolver(server: &mockito::Server) -> MetaResolver {
        MetaResolver::new(reqwest::Client::new(), HashMap::new())
            .with_manifest_url(format!("{}/manifest.json", server.url()))
            .with_maven_mirror(format!("{}/maven", server.url()))
    }

    #[tokio::test]
    async fn resolves_game_version() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mojang(&mut server).await;

        let resolved = resolver(&server)
            .resolve(&InstallRequest::game_version("1.20.4", "/x/inst"))
            .await
            .unwrap();

        let paths: Vec<_> = resolved
            .artifacts
            .iter()
            .map(|a| a.relative_path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            paths,
            [
                "versions/1.20.4/1.20.4.json",
                "versions/1.20.4/1.20.4.jar",
                "assets/objects/33/3333333333333333333333333333333333333333",
                "assets/indexes/12.json",
            ]
        );
        assert!(resolved.installer_loader().is_none());
    }

    #[tokio::test]
    async fn unknown_game_version_is_a_resolution_error() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mojang(&mut server).await;

        let err = resolver(&server)
            .resolve(&InstallRequest::game_version("9.9.9", "/x/inst"))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Resolution(_)));
    }

    #[tokio::test]
    async fn unpublished_loader_version_is_a_resolution_error() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("HEAD", "/maven/net/fabricmc/fabric-loader/0.0.0/fabric-loader-0.0.0.jar")
            .with_status(404)
            .create_async()
            .await;

        let err = resolver(&server)
            .resolve(&InstallRequest::mod_loader(
                "1.20.4",
                ModLoaderKind::Fabric,
                "0.0.0",
                "/x/inst",
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Resolution(_)));
        probe.assert_async().await;
    }

    #[tokio::test]
    async fn loader_install_adds_installer_artifact() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mojang(&mut server).await;
        let _probe = server
            .mock("HEAD", "/maven/net/minecraftforge/forge/1.20.4-49.0.3/forge-1.20.4-49.0.3-installer.jar")
            .with_status(200)
            .create_async()
            .await;

        let resolved = resolver(&server)
            .with_assets(false)
            .resolve(&InstallRequest::mod_loader(
                "1.20.4",
                ModLoaderKind::Forge,
                "49.0.3",
                "/x/inst",
            ))
            .await
            .unwrap();

        let installer = resolved
            .artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::Installer)
            .unwrap();
        assert!(installer.url.ends_with("forge-1.20.4-49.0.3-installer.jar"));
        assert_eq!(resolved.installer_loader().unwrap().kind, ModLoaderKind::Forge);
    }

    #[tokio::test]
    async fn modpack_comes_from_the_catalog() {
        let mut server = mockito::Server::new_async().await;
        let _mocks = mojang(&mut server).await;

        let mut catalog = HashMap::new();
        catalog.insert(
            "skyblock".to_string(),
            ModpackSource {
                url: format!("{}/packs/skyblock.zip", server.url()),
                sha1: None,
                minecraft_version: "1.20.4".into(),
                loader: None,
            },
        );
        let resolver = MetaResolver::new(reqwest::Client::new(), catalog)
            .with_manifest_url(format!("{}/manifest.json", server.url()))
            .with_assets(false);

        let resolved = resolver
            .resolve(&InstallRequest::modpack("skyblock", "/x/inst"))
            .await
            .unwrap();
        assert_eq!(resolved.minecraft_version, "1.20.4");
        assert!(resolved
            .artifacts
            .iter()
            .any(|a| a.kind == ArtifactKind::Archive
                && a.relative_path == PathBuf::from("modpacks/skyblock.zip")));

        let err = resolver
            .resolve(&InstallRequest::modpack("nope", "/x/inst"))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::Resolution(_)));
    }
}
