use std::path::Path;

use super::installer::{HostedArtifact, LoaderInstaller};

/// Vanilla needs nothing beyond the game version's own artifacts.
pub struct VanillaInstaller;

impl LoaderInstaller for VanillaInstaller {
    fn installer_artifact(&self, _: &str, _: &str) -> Option<HostedArtifact> {
        None
    }

    fn installer_args(&self, _: &Path, _: &Path, _: &str, _: &str) -> Vec<String> {
        Vec::new()
    }
}
