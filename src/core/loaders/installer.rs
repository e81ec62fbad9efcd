use std::path::{Path, PathBuf};

use crate::core::install::{ArtifactDescriptor, ArtifactKind};
use crate::core::instance::ModLoaderKind;
use crate::core::maven::MavenArtifact;
use crate::core::version::version_file::PRIORITY_METADATA;

use super::{
    fabric::FabricInstaller, forge::ForgeInstaller, neoforge::NeoForgeInstaller,
    quilt::QuiltInstaller, vanilla::VanillaInstaller,
};

/// Installer jars are stored under `.artifacts/installers/`.
pub const INSTALLERS_DIR: &str = "installers";

/// A Maven artifact together with the repository that hosts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedArtifact {
    pub repository: &'static str,
    pub artifact: MavenArtifact,
}

impl HostedArtifact {
    pub fn url(&self) -> String {
        self.artifact.url(self.repository)
    }
}

/// Everything the orchestrator needs to know to install one loader kind.
pub trait LoaderInstaller: Send + Sync {
    /// The jar to download and run. `None` for vanilla.
    fn installer_artifact(&self, minecraft_version: &str, loader_version: &str)
        -> Option<HostedArtifact>;

    /// An artifact whose presence proves `loader_version` exists.
    fn version_probe(&self, minecraft_version: &str, loader_version: &str)
        -> Option<HostedArtifact> {
        self.installer_artifact(minecraft_version, loader_version)
    }

    /// Arguments passed to `java`, not including the java binary itself.
    fn installer_args(
        &self,
        installer: &Path,
        game_dir: &Path,
        minecraft_version: &str,
        loader_version: &str,
    ) -> Vec<String>;

    /// Whether the installer refuses to run without `launcher_profiles.json`.
    fn needs_launcher_profiles(&self) -> bool {
        false
    }
}

/// Static dispatch over the per-kind strategies.
pub enum Installer {
    Vanilla(VanillaInstaller),
    Fabric(FabricInstaller),
    Quilt(QuiltInstaller),
    Forge(ForgeInstaller),
    NeoForge(NeoForgeInstaller),
}

macro_rules! dispatch {
    ($self:ident, $i:ident => $call:expr) => {
        match $self {
            Installer::Vanilla($i) => $call,
            Installer::Fabric($i) => $call,
            Installer::Quilt($i) => $call,
            Installer::Forge($i) => $call,
            Installer::NeoForge($i) => $call,
        }
    };
}

impl Installer {
    pub fn new(kind: ModLoaderKind) -> Self {
        match kind {
            ModLoaderKind::Vanilla => Self::Vanilla(VanillaInstaller),
            ModLoaderKind::Fabric => Self::Fabric(FabricInstaller),
            ModLoaderKind::Quilt => Self::Quilt(QuiltInstaller),
            ModLoaderKind::Forge => Self::Forge(ForgeInstaller),
            ModLoaderKind::NeoForge => Self::NeoForge(NeoForgeInstaller),
        }
    }

    pub fn installer_artifact(&self, mc: &str, loader: &str) -> Option<HostedArtifact> {
        dispatch!(self, i => i.installer_artifact(mc, loader))
    }

    pub fn version_probe(&self, mc: &str, loader: &str) -> Option<HostedArtifact> {
        dispatch!(self, i => i.version_probe(mc, loader))
    }

    pub fn installer_args(
        &self,
        installer: &Path,
        game_dir: &Path,
        mc: &str,
        loader: &str,
    ) -> Vec<String> {
        dispatch!(self, i => i.installer_args(installer, game_dir, mc, loader))
    }

    pub fn needs_launcher_profiles(&self) -> bool {
        dispatch!(self, i => i.needs_launcher_profiles())
    }

    /// The installer jar as an artifact for the download batch, optionally
    /// served from a Maven mirror instead of the loader's own repository.
    pub fn installer_descriptor(
        &self,
        mc: &str,
        loader: &str,
        repository: Option<&str>,
    ) -> Option<ArtifactDescriptor> {
        let hosted = self.installer_artifact(mc, loader)?;
        Some(
            ArtifactDescriptor::file(
                hosted.artifact.url(repository.unwrap_or(hosted.repository)),
                PathBuf::from(INSTALLERS_DIR).join(hosted.artifact.filename()),
            )
            .with_kind(ArtifactKind::Installer)
            .with_priority(PRIORITY_METADATA),
        )
    }
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
