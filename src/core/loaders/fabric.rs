use std::path::Path;

use super::installer::{path_arg, HostedArtifact, LoaderInstaller};
use crate::core::maven::{MavenArtifact, FABRIC_MAVEN};

/// The installer is versioned independently of the loader it installs.
pub const FABRIC_INSTALLER_VERSION: &str = "1.0.1";

pub struct FabricInstaller;

impl LoaderInstaller for FabricInstaller {
    fn installer_artifact(&self, _: &str, _: &str) -> Option<HostedArtifact> {
        Some(HostedArtifact {
            repository: FABRIC_MAVEN,
            artifact: MavenArtifact {
                group_id: "net.fabricmc".into(),
                artifact_id: "fabric-installer".into(),
                version: FABRIC_INSTALLER_VERSION.into(),
                classifier: None,
                extension: "jar".into(),
            },
        })
    }

    fn version_probe(&self, _: &str, loader: &str) -> Option<HostedArtifact> {
        let artifact = MavenArtifact::parse(&format!("net.fabricmc:fabric-loader:{}", loader)).ok()?;
        Some(HostedArtifact {
            repository: FABRIC_MAVEN,
            artifact,
        })
    }

    fn installer_args(
        &self,
        installer: &Path,
        game_dir: &Path,
        mc: &str,
        loader: &str,
    ) -> Vec<String> {
        vec![
            "-jar".into(),
            path_arg(installer),
            "client".into(),
            "-dir".into(),
            path_arg(game_dir),
            "-mcversion".into(),
            mc.into(),
            "-loader".into(),
            loader.into(),
            "-noprofile".into(),
        ]
    }
}
