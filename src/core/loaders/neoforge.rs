use std::path::Path;

use super::installer::{path_arg, HostedArtifact, LoaderInstaller};
use crate::core::maven::{MavenArtifact, NEOFORGE_MAVEN};

/// NeoForge installer — same CLI as Forge, different Maven coordinates.
pub struct NeoForgeInstaller;

/// NeoForge for 1.20.1 was published under `net.neoforged:forge`.
const LEGACY_MINECRAFT_VERSION: &str = "1.20.1";

impl LoaderInstaller for NeoForgeInstaller {
    fn installer_artifact(&self, mc: &str, loader: &str) -> Option<HostedArtifact> {
        let artifact = if mc == LEGACY_MINECRAFT_VERSION {
            let version = if loader.starts_with("1.20.1-") {
                loader.to_string()
            } else {
                format!("{}-{}", mc, loader)
            };
            MavenArtifact::installer("net.neoforged", "forge", &version)
        } else {
            MavenArtifact::installer("net.neoforged", "neoforge", loader)
        };
        Some(HostedArtifact {
            repository: NEOFORGE_MAVEN,
            artifact,
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
