pub mod fabric;
pub mod forge;
pub mod installer;
pub mod neoforge;
pub mod quilt;
pub mod vanilla;

pub use installer::{HostedArtifact, Installer, LoaderInstaller, INSTALLERS_DIR};
