use std::path::Path;

use super::installer::{path_arg, HostedArtifact, LoaderInstaller};
use crate::core::maven::{MavenArtifact, FORGE_MAVEN};

/// Installs Forge by running the official installer JAR in client mode.
pub struct ForgeInstaller;

impl ForgeInstaller {
    /// Forge versions are published as `<mc>-<forge>`; accept either form.
    pub fn full_version(minecraft_version: &str, loader_version: &str) -> String {
        let prefix = format!("{}-", minecraft_version);
        if loader_version.starts_with(&prefix) {
            loader_version.to_string()
        } else {
            format!("{}{}", prefix, loader_version)
        }
    }
}

impl LoaderInstaller for ForgeInstaller {
    fn installer_artifact(&self, mc: &str, loader: &str) -> Option<HostedArtifact> {
        Some(HostedArtifact {
            repository: FORGE_MAVEN,
            artifact: MavenArtifact::installer(
                "net.minecraftforge",
                "forge",
                &Self::full_version(mc, loader),
            ),
        })
    }

    fn installer_args(&self, installer: &Path, game_dir: &Path, _: &str, _: &str) -> Vec<String> {
        vec![
            "-jar".into(),
            path_arg(installer),
            "--installClient".into(),
            path_arg(game_dir),
        ]
    }

    fn needs_launcher_profiles(&self) -> bool {
        true
    }
}
