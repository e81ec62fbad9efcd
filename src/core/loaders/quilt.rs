use std::path::Path;

use super::installer::{path_arg, HostedArtifact, LoaderInstaller};
use crate::core::maven::{MavenArtifact, QUILT_MAVEN};

pub const QUILT_INSTALLER_VERSION: &str = "0.9.2";

/// Installs Quilt loader via the standalone Quilt installer (CLI mirrors Fabric's).
pub struct QuiltInstaller;

impl LoaderInstaller for QuiltInstaller {
    fn installer_artifact(&self, _: &str, _: &str) -> Option<HostedArtifact> {
        Some(HostedArtifact {
            repository: QUILT_MAVEN,
            artifact: MavenArtifact {
                group_id: "org.quiltmc".into(),
                artifact_id: "quilt-installer".into(),
                version: QUILT_INSTALLER_VERSION.into(),
                classifier: None,
                extension: "jar".into(),
            },
        })
    }

    fn version_probe(&self, _: &str, loader: &str) -> Option<HostedArtifact> {
        let artifact = MavenArtifact::parse(&format!("org.quiltmc:quilt-loader:{}", loader)).ok()?;
        Some(HostedArtifact {
            repository: QUILT_MAVEN,
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
            "install".into(),
            "client".into(),
            mc.into(),
            loader.into(),
            format!("--install-dir={}", game_dir.display()),
            "--no-profile".into(),
        ]
    }
}
