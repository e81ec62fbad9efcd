// ─── Installation Orchestrator ───
// Drives one InstallRequest through Resolve → Acquire → Apply → Normalize →
// Commit. A manifest is written only after every earlier stage succeeded.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::archive;
use super::artifact::{ArtifactDescriptor, ArtifactKind};
use super::events::{EventSink, InstallEvent, EVENT_CHANNEL_CAPACITY};
use super::process::ProcessRunner;
use super::request::InstallRequest;
use super::resolver::{ResolvedInstall, VersionResolver};
use super::InstallStage;
use crate::core::downloader::{
    ArtifactFetcher, DownloadConfig, DownloadCounters, DownloadManager, TaskState,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{
    InstallManifest, InstanceManager, ManifestArtifact, UninstallOutcome, ValidationStatus,
    ARTIFACT_STORE_DIR, GAME_DIR, LAUNCHER_PROFILES_FILE,
};
use crate::core::loaders::Installer;

const LAUNCHER_PROFILES_STUB: &[u8] = br#"{"profiles":{},"selectedProfile":null}"#;

/// Outcome of a successful install call.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub request_id: Uuid,
    pub manifest: InstallManifest,
    /// A matching, valid manifest already existed; nothing was touched.
    pub skipped: bool,
    /// Network transfers performed, retries included.
    pub transfers: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes an instance path from the active set when dropped.
struct InstanceLock<'a> {
    active: &'a Mutex<HashSet<PathBuf>>,
    path: PathBuf,
}

impl Drop for InstanceLock<'_> {
    fn drop(&mut self) {
        lock(self.active).remove(&self.path);
    }
}

/// Unregisters an in-flight download batch when dropped.
struct BatchGuard<'a> {
    batches: &'a Mutex<HashMap<Uuid, Arc<DownloadManager>>>,
    id: Uuid,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        lock(self.batches).remove(&self.id);
    }
}

pub struct InstallOrchestrator {
    fetcher: Arc<dyn ArtifactFetcher>,
    download_config: DownloadConfig,
    resolver: Arc<dyn VersionResolver>,
    runner: Arc<dyn ProcessRunner>,
    instances: Arc<InstanceManager>,
    java_path: String,
    events: broadcast::Sender<InstallEvent>,
    active: Mutex<HashSet<PathBuf>>,
    batches: Mutex<HashMap<Uuid, Arc<DownloadManager>>>,
}

impl InstallOrchestrator {
    pub fn new(
        fetcher: Arc<dyn ArtifactFetcher>,
        download_config: DownloadConfig,
        resolver: Arc<dyn VersionResolver>,
        runner: Arc<dyn ProcessRunner>,
        instances: Arc<InstanceManager>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            fetcher,
            download_config,
            resolver,
            runner,
            instances,
            java_path: "java".to_string(),
            events,
            active: Mutex::new(HashSet::new()),
            batches: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_java_path(mut self, java_path: impl Into<String>) -> Self {
        self.java_path = java_path.into();
        self
    }

    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    /// Progress events for every request submitted after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<InstallEvent> {
        self.events.subscribe()
    }

    /// Counters of every download batch currently running.
    pub fn in_flight(&self) -> Vec<(Uuid, DownloadCounters)> {
        lock(&self.batches)
            .iter()
            .map(|(id, manager)| (*id, manager.counters()))
            .collect()
    }

    pub fn is_installing(&self, instance_dir: &Path) -> bool {
        lock(&self.active).contains(instance_dir)
    }

    fn lock_instance(&self, path: &Path) -> LauncherResult<InstanceLock<'_>> {
        let mut active = lock(&self.active);
        if !active.insert(path.to_path_buf()) {
            return Err(LauncherError::InstallInProgress(path.to_path_buf()));
        }
        Ok(InstanceLock {
            active: &self.active,
            path: path.to_path_buf(),
        })
    }

    // ── Install ─────────────────────────────────────────

    pub async fn install(&self, request: InstallRequest) -> LauncherResult<InstallReport> {
        let request_id = Uuid::new_v4();
        let events = EventSink::new(request_id, self.events.clone());
        let _lock = self.lock_instance(&request.instance_dir)?;

        info!(
            %request_id,
            instance = %request.instance_dir.display(),
            target = ?request.target,
            version = %request.version_id,
            "Install requested"
        );

        self.run_stages(request_id, &request, &events).await
    }

    async fn run_stages(
        &self,
        request_id: Uuid,
        request: &InstallRequest,
        events: &EventSink,
    ) -> LauncherResult<InstallReport> {
        let root = request.instance_dir.as_path();

        // 1. Resolve
        enter(events, InstallStage::Resolve, "Resolving artifacts");
        let resolved = self
            .resolver
            .resolve(request)
            .await
            .map_err(|e| match e {
                LauncherError::Resolution(_) => e,
                other => LauncherError::Resolution(other.to_string()),
            })
            .and_then(|resolved| {
                for artifact in &resolved.artifacts {
                    artifact.check_relative_path()?;
                }
                Ok(resolved)
            })
            .map_err(|e| fail(events, InstallStage::Resolve, e))?;
        let identities: Vec<ManifestArtifact> = resolved
            .artifacts
            .iter()
            .map(ManifestArtifact::from_descriptor)
            .collect();

        if let Some(existing) = self.instances.load_manifest(root).await? {
            if existing.matches(request, &identities)
                && self
                    .instances
                    .check_artifacts(root, &existing.artifacts)
                    .await?
                    .is_valid()
            {
                info!(%request_id, "Instance already installed, nothing to do");
                events.emit(InstallStage::Commit, 100, "Already installed");
                return Ok(InstallReport {
                    request_id,
                    manifest: existing,
                    skipped: true,
                    transfers: 0,
                });
            }
            info!(%request_id, "Installed manifest differs, reinstalling");
            self.instances.remove_manifest(root).await?;
        }

        // 2. Acquire
        enter(events, InstallStage::Acquire, "Downloading artifacts");
        let transfers = self
            .acquire(request_id, root, &resolved.artifacts, events)
            .await
            .map_err(|e| fail(events, InstallStage::Acquire, e))?;

        // 3. Apply
        enter(events, InstallStage::Apply, "Applying artifacts");
        self.apply(root, &resolved)
            .await
            .map_err(|e| fail(events, InstallStage::Apply, e))?;

        // 4. Normalize
        enter(events, InstallStage::Normalize, "Normalizing instance layout");
        self.instances
            .normalize(root)
            .await
            .map_err(|e| fail(events, InstallStage::Normalize, e))?;

        // 5. Commit
        enter(events, InstallStage::Commit, "Writing manifest");
        let manifest = self
            .commit(root, request, identities)
            .await
            .map_err(|e| fail(events, InstallStage::Commit, e))?;

        events.emit(InstallStage::Commit, 100, "Installed");
        info!(%request_id, transfers, "Install committed");
        Ok(InstallReport {
            request_id,
            manifest,
            skipped: false,
            transfers,
        })
    }

    /// Writes the manifest only if every artifact still verifies after
    /// Apply and Normalize.
    async fn commit(
        &self,
        root: &Path,
        request: &InstallRequest,
        identities: Vec<ManifestArtifact>,
    ) -> LauncherResult<InstallManifest> {
        let status = self.instances.check_artifacts(root, &identities).await?;
        if let ValidationStatus::Invalid { missing, corrupt } = status {
            return Err(LauncherError::Commit(format!(
                "artifacts changed after acquire (missing: {:?}, corrupt: {:?})",
                missing, corrupt
            )));
        }

        let manifest = InstallManifest::new(request, identities);
        self.instances.save_manifest(root, &manifest).await?;
        Ok(manifest)
    }

    async fn acquire(
        &self,
        request_id: Uuid,
        root: &Path,
        artifacts: &[ArtifactDescriptor],
        events: &EventSink,
    ) -> LauncherResult<usize> {
        if artifacts.is_empty() {
            return Ok(0);
        }

        let manager = Arc::new(DownloadManager::new(
            Arc::clone(&self.fetcher),
            self.download_config.clone(),
        ));
        manager.enqueue_all(artifacts.iter().map(|artifact| {
            artifact.to_task(root.join(artifact.instance_relative_path(GAME_DIR, ARTIFACT_STORE_DIR)))
        }));

        let total = artifacts.len();
        let finished = Arc::new(AtomicUsize::new(0));
        let report_progress = {
            let finished = Arc::clone(&finished);
            let events = events.clone();
            move |name: &str| {
                let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
                events.emit(
                    InstallStage::Acquire,
                    (done * 100 / total) as u8,
                    format!("{} ({}/{})", name, done, total),
                );
            }
        };
        let on_complete = report_progress.clone();
        manager.set_task_complete_callback(move |report| on_complete(&report.task.name));
        manager.set_task_failed_callback(move |report| report_progress(&report.task.name));

        lock(&self.batches).insert(request_id, Arc::clone(&manager));
        let _batch = BatchGuard {
            batches: &self.batches,
            id: request_id,
        };

        manager.start(self.download_config.max_workers);
        manager.wait_for_completion().await;

        if manager.failed_count() > 0 {
            let failed: Vec<String> = manager
                .tasks()
                .into_iter()
                .filter(|report| report.state == TaskState::Failed)
                .map(|report| match report.failure {
                    Some(failure) => format!("{} ({:?}: {})", report.task.name, failure.kind, failure.message),
                    None => report.task.name,
                })
                .collect();
            return Err(LauncherError::Acquire { failed });
        }

        Ok(manager.transfer_attempts())
    }

    async fn apply(&self, root: &Path, resolved: &ResolvedInstall) -> LauncherResult<()> {
        let store = root.join(ARTIFACT_STORE_DIR);

        for artifact in resolved
            .artifacts
            .iter()
            .filter(|a| a.kind == ArtifactKind::Archive)
        {
            let zip_path = store.join(&artifact.relative_path);
            let dest = root.to_path_buf();
            info!(archive = %zip_path.display(), "Extracting archive");
            tokio::task::spawn_blocking(move || archive::extract_zip(&zip_path, &dest))
                .await
                .map_err(|e| LauncherError::Apply(format!("Extraction task panicked: {}", e)))?
                .map_err(|e| match e {
                    LauncherError::Zip(_) | LauncherError::Apply(_) => e,
                    other => LauncherError::Apply(other.to_string()),
                })?;
        }

        let Some(spec) = resolved.installer_loader() else {
            return Ok(());
        };

        let installer = Installer::new(spec.kind);
        let installer_jar = resolved
            .artifacts
            .iter()
            .find(|a| a.kind == ArtifactKind::Installer)
            .map(|a| store.join(&a.relative_path))
            .ok_or_else(|| {
                LauncherError::Apply(format!("No installer artifact resolved for {}", spec.kind))
            })?;

        let game_dir = root.join(GAME_DIR);
        tokio::fs::create_dir_all(&game_dir)
            .await
            .map_err(LauncherError::io(&game_dir))?;

        if installer.needs_launcher_profiles() {
            let profiles = game_dir.join(LAUNCHER_PROFILES_FILE);
            if !profiles.exists() {
                tokio::fs::write(&profiles, LAUNCHER_PROFILES_STUB)
                    .await
                    .map_err(LauncherError::io(&profiles))?;
            }
        }

        let mut argv = vec![self.java_path.clone()];
        argv.extend(installer.installer_args(
            &installer_jar,
            &game_dir,
            &resolved.minecraft_version,
            &spec.version,
        ));

        let report = self.runner.run(&argv, &game_dir).await?;
        if !report.success() {
            return Err(LauncherError::Apply(format!(
                "{} installer exited with {}\nSTDOUT:\n{}\nSTDERR:\n{}",
                spec.kind,
                report
                    .code
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {}", c)),
                report.stdout,
                report.stderr
            )));
        }

        info!(loader = %spec.kind, version = %spec.version, "Loader installer finished");
        Ok(())
    }

    // ── Queries / removal ───────────────────────────────

    pub async fn list_installed(&self) -> LauncherResult<Vec<InstallManifest>> {
        self.instances.list_installed().await
    }

    pub async fn validate(&self, id: &str) -> LauncherResult<InstallManifest> {
        self.instances.validate(id).await
    }

    /// Remove an instance by id. Refused while an install is running on it.
    pub async fn uninstall(&self, id: &str) -> LauncherResult<UninstallOutcome> {
        let path = self.instances.instance_path(id)?;
        let _lock = self.lock_instance(&path)?;
        self.instances.uninstall(id).await
    }
}

fn enter(events: &EventSink, stage: InstallStage, message: &str) {
    info!(?stage, "{}", message);
    events.emit(stage, 0, message);
}

fn fail(events: &EventSink, stage: InstallStage, e: LauncherError) -> LauncherError {
    error!(?stage, error = %e, "Install stage failed");
    events.emit(stage, 0, format!("Failed: {}", e));
    if stage == InstallStage::Acquire {
        warn!("Partially acquired artifacts are left in place");
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::ProgressFn;
    use crate::core::install::archive::tests::zip_bytes;
    use crate::core::install::process::ExitReport;
    use crate::core::install::request::LoaderSpec;
    use crate::core::instance::{ModLoaderKind, MANIFEST_FILE};
    use async_trait::async_trait;
    use sha1::{Digest, Sha1};
    use std::time::Duration;
    use tempfile::TempDir;

    // ── Fakes ───────────────────────────────────────────

    /// Serves fixed bodies by URL and counts transfers.
    #[derive(Default)]
    struct MapFetcher {
        bodies: Mutex<HashMap<String, Vec<u8>>>,
        fetches: AtomicUsize,
    }

    impl MapFetcher {
        fn serve(&self, url: &str, body: &[u8]) {
            lock(&self.bodies).insert(url.to_string(), body.to_vec());
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArtifactFetcher for MapFetcher {
        async fn fetch(
            &self,
            url: &str,
            dest: &Path,
            _timeout: Duration,
            _on_progress: Option<ProgressFn<'_>>,
        ) -> LauncherResult<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let body = lock(&self.bodies).get(url).cloned();
            let Some(body) = body else {
                return Err(LauncherError::DownloadFailed {
                    url: url.to_string(),
                    status: 404,
                });
            };
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(dest, body).await?;
            Ok(())
        }
    }

    /// Returns a preset resolution, or a resolution error when unset.
    struct StaticResolver {
        resolved: Mutex<Option<ResolvedInstall>>,
    }

    impl StaticResolver {
        fn new(resolved: Option<ResolvedInstall>) -> Self {
            Self {
                resolved: Mutex::new(resolved),
            }
        }

        fn set(&self, resolved: ResolvedInstall) {
            *lock(&self.resolved) = Some(resolved);
        }
    }

    #[async_trait]
    impl VersionResolver for StaticResolver {
        async fn resolve(&self, request: &InstallRequest) -> LauncherResult<ResolvedInstall> {
            lock(&self.resolved).clone().ok_or_else(|| {
                LauncherError::Resolution(format!("unknown version {}", request.version_id))
            })
        }
    }

    /// Records argv and exits with a preset code.
    struct RecordingRunner {
        exit_code: Mutex<i32>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingRunner {
        fn new(exit_code: i32) -> Self {
            Self {
                exit_code: Mutex::new(exit_code),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            lock(&self.calls).clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, argv: &[String], working_dir: &Path) -> LauncherResult<ExitReport> {
            lock(&self.calls).push(argv.to_vec());
            let code = *lock(&self.exit_code);
            if code == 0 {
                // What a real loader installer leaves behind.
                let marker = working_dir.join("versions").join("loader").join("loader.json");
                tokio::fs::create_dir_all(marker.parent().unwrap()).await?;
                tokio::fs::write(&marker, b"{}").await?;
            }
            Ok(ExitReport {
                code: Some(code),
                stdout: String::new(),
                stderr: "boom".into(),
            })
        }
    }

    struct Harness {
        _dir: TempDir,
        fetcher: Arc<MapFetcher>,
        resolver: Arc<StaticResolver>,
        runner: Arc<RecordingRunner>,
        orchestrator: InstallOrchestrator,
        instance: PathBuf,
    }

    fn harness(resolved: Option<ResolvedInstall>, exit_code: i32) -> Harness {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MapFetcher::default());
        let resolver = Arc::new(StaticResolver::new(resolved));
        let runner = Arc::new(RecordingRunner::new(exit_code));
        let instances = Arc::new(InstanceManager::new(dir.path().join("instances")));
        let config = DownloadConfig {
            max_workers: 2,
            max_retries: 0,
            timeout_secs: 5,
            commit_attempts: 2,
            commit_backoff_ms: 0,
            inter_task_pause_ms: 0,
            retry_backoff_ms: 0,
        };
        let orchestrator = InstallOrchestrator::new(
            fetcher.clone(),
            config,
            resolver.clone(),
            runner.clone(),
            instances.clone(),
        )
        .with_java_path("/opt/java/bin/java");
        let instance = instances.instance_path("alpha").unwrap();

        Harness {
            _dir: dir,
            fetcher,
            resolver,
            runner,
            orchestrator,
            instance,
        }
    }

    fn sha1_hex(body: &[u8]) -> String {
        hex::encode(Sha1::digest(body))
    }

    fn game(fetcher: &MapFetcher) -> Vec<ArtifactDescriptor> {
        fetcher.serve("https://meta/1.20.4.json", b"{\"id\":\"1.20.4\"}");
        fetcher.serve("https://data/client.jar", b"client");
        fetcher.serve("https://libs/brigadier.jar", b"brigadier");
        vec![
            ArtifactDescriptor::file("https://meta/1.20.4.json", "versions/1.20.4/1.20.4.json")
                .with_priority(10),
            ArtifactDescriptor::file("https://data/client.jar", "versions/1.20.4/1.20.4.jar")
                .with_digest(Some(sha1_hex(b"client")))
                .with_priority(5),
            ArtifactDescriptor::file("https://libs/brigadier.jar", "libraries/brigadier.jar")
                .with_digest(Some(sha1_hex(b"brigadier"))),
        ]
    }

    fn vanilla(fetcher: &MapFetcher) -> ResolvedInstall {
        ResolvedInstall {
            minecraft_version: "1.20.4".into(),
            loader: None,
            artifacts: game(fetcher),
        }
    }

    fn forge(fetcher: &MapFetcher, version: &str) -> ResolvedInstall {
        let url = format!("https://maven/forge-{}-installer.jar", version);
        fetcher.serve(&url, b"installer");
        let installer = Installer::new(ModLoaderKind::Forge)
            .installer_descriptor("1.20.4", version, None)
            .unwrap();
        let mut artifacts = game(fetcher);
        artifacts.push(ArtifactDescriptor { url, ..installer });
        ResolvedInstall {
            minecraft_version: "1.20.4".into(),
            loader: Some(LoaderSpec {
                kind: ModLoaderKind::Forge,
                version: version.into(),
            }),
            artifacts,
        }
    }

    fn forge_request(h: &Harness, version: &str) -> InstallRequest {
        InstallRequest::mod_loader("1.20.4", ModLoaderKind::Forge, version, &h.instance)
    }

    // ── Scenarios ───────────────────────────────────────

    #[tokio::test]
    async fn installs_game_version_and_commits_manifest() {
        let h = harness(None, 0);
        h.resolver.set(vanilla(&h.fetcher));
        let mut events = h.orchestrator.subscribe();

        let report = h
            .orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await
            .unwrap();

        assert!(!report.skipped);
        assert_eq!(report.transfers, 3);
        assert_eq!(
            std::fs::read(h.instance.join("minecraft/versions/1.20.4/1.20.4.jar")).unwrap(),
            b"client"
        );
        assert!(h.instance.join("minecraft/mods").is_dir());
        assert!(h.instance.join(MANIFEST_FILE).is_file());
        assert_eq!(report.manifest.artifacts.len(), 3);
        assert!(h.runner.calls().is_empty());

        let mut stages = Vec::new();
        while let Ok(event) = events.try_recv() {
            assert_eq!(event.request_id, report.request_id);
            if stages.last() != Some(&event.stage) {
                stages.push(event.stage);
            }
        }
        assert_eq!(
            stages,
            [
                InstallStage::Resolve,
                InstallStage::Acquire,
                InstallStage::Apply,
                InstallStage::Normalize,
                InstallStage::Commit
            ]
        );
        assert!(h.orchestrator.in_flight().is_empty());
    }

    #[tokio::test]
    async fn identical_request_is_a_no_op() {
        let h = harness(None, 0);
        h.resolver.set(forge(&h.fetcher, "49.0.3"));

        h.orchestrator.install(forge_request(&h, "49.0.3")).await.unwrap();
        let fetches = h.fetcher.fetches();

        let second = h.orchestrator.install(forge_request(&h, "49.0.3")).await.unwrap();

        assert!(second.skipped);
        assert_eq!(second.transfers, 0);
        assert_eq!(h.fetcher.fetches(), fetches);
        assert_eq!(h.runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn corrupted_artifact_forces_reinstall() {
        let h = harness(None, 0);
        h.resolver.set(vanilla(&h.fetcher));
        let request = InstallRequest::game_version("1.20.4", &h.instance);

        h.orchestrator.install(request.clone()).await.unwrap();
        std::fs::write(h.instance.join("minecraft/libraries/brigadier.jar"), b"tampered").unwrap();

        let again = h.orchestrator.install(request).await.unwrap();
        assert!(!again.skipped);
        assert_eq!(
            std::fs::read(h.instance.join("minecraft/libraries/brigadier.jar")).unwrap(),
            b"brigadier"
        );
    }

    #[tokio::test]
    async fn unknown_loader_version_fails_before_touching_disk() {
        let h = harness(None, 0);

        let err = h
            .orchestrator
            .install(forge_request(&h, "0.0.0"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(InstallStage::Resolve));
        assert!(!h.instance.exists());
        assert_eq!(h.fetcher.fetches(), 0);
    }

    #[tokio::test]
    async fn failed_installer_leaves_no_manifest_and_retries_fully() {
        let h = harness(None, 1);
        h.resolver.set(forge(&h.fetcher, "49.0.3"));

        let err = h
            .orchestrator
            .install(forge_request(&h, "49.0.3"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Some(InstallStage::Apply));
        assert!(!h.instance.join(MANIFEST_FILE).exists());
        let fetches = h.fetcher.fetches();

        *lock(&h.runner.exit_code) = 0;
        let report = h.orchestrator.install(forge_request(&h, "49.0.3")).await.unwrap();

        assert!(!report.skipped);
        // The installer jar has no digest, so it is transferred again.
        assert!(h.fetcher.fetches() > fetches);
        assert_eq!(h.runner.calls().len(), 2);
        assert!(h.instance.join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn installer_runs_with_java_and_profiles_stub() {
        let h = harness(None, 0);
        h.resolver.set(forge(&h.fetcher, "49.0.3"));

        h.orchestrator.install(forge_request(&h, "49.0.3")).await.unwrap();

        let argv = &h.runner.calls()[0];
        assert_eq!(argv[0], "/opt/java/bin/java");
        assert_eq!(argv[1], "-jar");
        assert!(argv[2].ends_with("forge-1.20.4-49.0.3-installer.jar"));
        assert_eq!(argv[3], "--installClient");
        assert!(h.instance.join("minecraft/launcher_profiles.json").exists());
        assert!(h.instance.join("minecraft/versions/loader/loader.json").exists());
        assert!(h
            .instance
            .join(".artifacts/installers/forge-1.20.4-49.0.3-installer.jar")
            .exists());
    }

    #[tokio::test]
    async fn failed_download_fails_acquire() {
        let h = harness(None, 0);
        let mut resolved = vanilla(&h.fetcher);
        resolved
            .artifacts
            .push(ArtifactDescriptor::file("https://libs/missing.jar", "libraries/missing.jar"));
        h.resolver.set(resolved);

        let err = h
            .orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await
            .unwrap_err();

        match &err {
            LauncherError::Acquire { failed } => {
                assert_eq!(failed.len(), 1);
                assert!(failed[0].starts_with("missing.jar"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!h.instance.join(MANIFEST_FILE).exists());
        // Siblings stay for inspection.
        assert!(h.instance.join("minecraft/versions/1.20.4/1.20.4.jar").exists());
    }

    #[tokio::test]
    async fn digest_mismatch_fails_acquire() {
        let h = harness(None, 0);
        let mut resolved = vanilla(&h.fetcher);
        resolved.artifacts[1].digest = Some(sha1_hex(b"something else"));
        h.resolver.set(resolved);

        let err = h
            .orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(InstallStage::Acquire));
        assert!(!h.instance.join("minecraft/versions/1.20.4/1.20.4.jar").exists());
    }

    #[tokio::test]
    async fn modpack_archive_is_extracted_and_normalized() {
        let h = harness(None, 0);
        let pack = zip_bytes(&[
            ("Skyblock/mods/islands.jar", b"mod"),
            ("Skyblock/config/islands.toml", b"cfg"),
            ("Skyblock/options.txt", b"opts"),
        ]);
        h.fetcher.serve("https://packs/skyblock.zip", &pack);
        let mut resolved = vanilla(&h.fetcher);
        resolved.artifacts.push(
            ArtifactDescriptor::file("https://packs/skyblock.zip", "modpacks/skyblock.zip")
                .with_kind(ArtifactKind::Archive)
                .with_digest(Some(sha1_hex(&pack))),
        );
        h.resolver.set(resolved);

        h.orchestrator
            .install(InstallRequest::modpack("skyblock", &h.instance))
            .await
            .unwrap();

        let game = h.instance.join("minecraft");
        assert_eq!(std::fs::read(game.join("mods/islands.jar")).unwrap(), b"mod");
        assert_eq!(std::fs::read(game.join("config/islands.toml")).unwrap(), b"cfg");
        assert_eq!(std::fs::read(game.join("options.txt")).unwrap(), b"opts");
        assert!(!h.instance.join("Skyblock").exists());
        assert!(h.instance.join(".artifacts/modpacks/skyblock.zip").exists());
    }

    #[tokio::test]
    async fn archive_overwriting_an_artifact_fails_commit() {
        let h = harness(None, 0);
        let pack = zip_bytes(&[("Skyblock/versions/1.20.4/1.20.4.jar", b"patched client")]);
        h.fetcher.serve("https://packs/skyblock.zip", &pack);
        let mut resolved = vanilla(&h.fetcher);
        resolved.artifacts.push(
            ArtifactDescriptor::file("https://packs/skyblock.zip", "modpacks/skyblock.zip")
                .with_kind(ArtifactKind::Archive),
        );
        h.resolver.set(resolved);

        let err = h
            .orchestrator
            .install(InstallRequest::modpack("skyblock", &h.instance))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(InstallStage::Commit));
        assert!(err.to_string().contains("1.20.4.jar"));
        assert!(!h.instance.join(MANIFEST_FILE).exists());
        assert!(!h.orchestrator.is_installing(&h.instance));
    }

    #[tokio::test]
    async fn artifact_path_escaping_the_instance_fails_resolve() {
        let h = harness(None, 0);
        h.fetcher.serve("https://libs/escaped.jar", b"escaped");
        let mut resolved = vanilla(&h.fetcher);
        resolved
            .artifacts
            .push(ArtifactDescriptor::file("https://libs/escaped.jar", "../../escaped.jar"));
        h.resolver.set(resolved);

        let err = h
            .orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Resolution(_)));
        assert_eq!(h.fetcher.fetches(), 0);
        assert!(!h.instance.exists());
        assert!(!h.instance.parent().unwrap().join("escaped.jar").exists());
    }

    #[tokio::test]
    async fn uninstall_refuses_ids_outside_the_instances_dir() {
        let h = harness(None, 0);
        let victim = h.instance.parent().unwrap().parent().unwrap().join("victim");
        std::fs::create_dir_all(&victim).unwrap();

        let err = h.orchestrator.uninstall("../victim").await.unwrap_err();

        assert!(matches!(err, LauncherError::InvalidInstanceId(_)));
        assert!(victim.exists());
    }

    #[tokio::test]
    async fn loader_update_reruns_and_keeps_user_data() {
        let h = harness(None, 0);
        h.resolver.set(forge(&h.fetcher, "49.0.3"));
        h.orchestrator.install(forge_request(&h, "49.0.3")).await.unwrap();

        let world = h.instance.join("minecraft/saves/world/level.dat");
        std::fs::create_dir_all(world.parent().unwrap()).unwrap();
        std::fs::write(&world, b"precious").unwrap();
        std::fs::write(h.instance.join("minecraft/mods/user.jar"), b"mine").unwrap();

        h.resolver.set(forge(&h.fetcher, "49.1.0"));
        let report = h.orchestrator.install(forge_request(&h, "49.1.0")).await.unwrap();

        assert!(!report.skipped);
        assert_eq!(report.manifest.loader.unwrap().version, "49.1.0");
        assert_eq!(h.runner.calls().len(), 2);
        assert_eq!(std::fs::read(&world).unwrap(), b"precious");
        assert_eq!(
            std::fs::read(h.instance.join("minecraft/mods/user.jar")).unwrap(),
            b"mine"
        );
    }

    #[tokio::test]
    async fn concurrent_install_on_same_instance_is_refused() {
        let h = harness(None, 0);
        h.resolver.set(vanilla(&h.fetcher));

        let _held = h.orchestrator.lock_instance(&h.instance).unwrap();
        assert!(h.orchestrator.is_installing(&h.instance));

        let err = h
            .orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::InstallInProgress(_)));
    }

    #[tokio::test]
    async fn lock_is_released_after_failure() {
        let h = harness(None, 0);
        let _ = h
            .orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await;
        assert!(!h.orchestrator.is_installing(&h.instance));
    }

    #[tokio::test]
    async fn list_validate_and_uninstall() {
        let h = harness(None, 0);
        h.resolver.set(vanilla(&h.fetcher));
        h.orchestrator
            .install(InstallRequest::game_version("1.20.4", &h.instance))
            .await
            .unwrap();

        let installed = h.orchestrator.list_installed().await.unwrap();
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].instance_id, "alpha");
        assert!(h.orchestrator.validate("alpha").await.unwrap().validation.is_valid());

        assert_eq!(
            h.orchestrator.uninstall("alpha").await.unwrap(),
            UninstallOutcome::Removed
        );
        assert_eq!(
            h.orchestrator.uninstall("alpha").await.unwrap(),
            UninstallOutcome::NothingToDo
        );
        assert!(h.orchestrator.list_installed().await.unwrap().is_empty());
    }
}
