use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;

use super::settings::{default_data_dir, InstallerSettings};
use crate::core::downloader::{ArtifactFetcher, DownloadManager, HttpFetcher, MirrorFetcher};
use crate::core::error::LauncherResult;
use crate::core::http::build_http_client_with_redirects;
use crate::core::install::{InstallOrchestrator, MetaResolver, TokioProcessRunner};
use crate::core::instance::InstanceManager;

/// Everything a front-end needs, built from one data directory.
pub struct AppState {
    pub data_dir: PathBuf,
    pub settings: InstallerSettings,
    pub http_client: Client,
    pub instance_manager: Arc<InstanceManager>,
    /// Shared queue for ad-hoc downloads outside an install.
    pub downloader: Arc<DownloadManager>,
    pub orchestrator: Arc<InstallOrchestrator>,
}

impl AppState {
    pub fn new() -> LauncherResult<Self> {
        Self::with_data_dir(default_data_dir())
    }

    pub fn with_data_dir(data_dir: PathBuf) -> LauncherResult<Self> {
        let settings = InstallerSettings::load(&data_dir);
        let http_client = build_http_client_with_redirects(settings.max_redirects)?;

        let fetcher: Arc<dyn ArtifactFetcher> = match &settings.mirror_dir {
            Some(mirror) => {
                info!("Serving artifacts from local mirror {:?}", mirror);
                Arc::new(MirrorFetcher::new(mirror.clone()))
            }
            None => Arc::new(HttpFetcher::with_client(http_client.clone())),
        };

        let instance_manager = Arc::new(InstanceManager::new(data_dir.join("instances")));
        let downloader = Arc::new(DownloadManager::new(
            Arc::clone(&fetcher),
            settings.download.clone(),
        ));
        let resolver = Arc::new(MetaResolver::new(
            http_client.clone(),
            settings.modpacks.clone(),
        ));
        let runner = Arc::new(TokioProcessRunner::new(
            settings.installer_timeout_secs.map(Duration::from_secs),
        ));
        let orchestrator = Arc::new(
            InstallOrchestrator::new(
                fetcher,
                settings.download.clone(),
                resolver,
                runner,
                Arc::clone(&instance_manager),
            )
            .with_java_path(settings.java_path.clone()),
        );

        Ok(Self {
            data_dir,
            settings,
            http_client,
            instance_manager,
            downloader,
            orchestrator,
        })
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.data_dir.join("instances")
    }

    pub fn save_settings(&self) -> LauncherResult<()> {
        self.settings.save(&self.data_dir)
    }
}
