pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{LauncherError, LauncherResult};
pub use crate::core::install::{InstallOrchestrator, InstallRequest};
pub use crate::core::state::AppState;

/// Install the structured log subscriber. `RUST_LOG` overrides the default
/// filter; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,interface_installer=debug")),
        )
        .try_init();
}
