pub mod layout;
pub mod manager;
pub mod model;

pub use manager::{InstanceManager, UninstallOutcome};
pub use model::{
    InstallManifest, ManifestArtifact, ModLoaderKind, ValidationStatus, ARTIFACT_STORE_DIR,
    GAME_DIR, LAUNCHER_PROFILES_FILE, MANIFEST_FILE,
};
