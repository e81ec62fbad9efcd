mod archive;
mod artifact;
mod events;
mod orchestrator;
mod process;
mod request;
mod resolver;

use serde::Serialize;

pub use artifact::{ArtifactDescriptor, ArtifactKind};
pub use events::InstallEvent;
pub use orchestrator::{InstallOrchestrator, InstallReport};
pub use process::{ExitReport, ProcessRunner, TokioProcessRunner};
pub use request::{InstallRequest, InstallTarget, LoaderSpec};
pub use resolver::{MetaResolver, ModpackSource, ResolvedInstall, VersionResolver, MODPACKS_DIR};

/// Ordered stages of one install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    Resolve,
    Acquire,
    Apply,
    Normalize,
    Commit,
}
