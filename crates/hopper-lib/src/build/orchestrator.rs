use crate::build::record::{remove_launch_profile, write_launch_profile, BuildConfig, BuildRecord};
use crate::build::state::{BuildState, BuildStateStore, BuildStatus};
use crate::config::PipelineConfig;
use crate::error::{ErrorKind, PipelineError, PipelineResult};
use crate::game::installer::core::traits::InstallContext;
use crate::game::installer::types::{Arch, DataLayout, LogSink, OsType, ProgressSink, ScaledProgress};
use crate::game::installer::vanilla::{fetch_assets, fetch_base_libraries, fetch_client_jar};
use crate::game::installer::{get_installer, FetchEngine, Transport};
use crate::game::launcher::{self, resolve_version_chain, LaunchAssembler, LaunchRequest, ResolvedInstance};
use crate::game::metadata::types::ManifestEntry;
use crate::game::metadata::{LoaderKind, VersionResolver};
use crate::utils::{locate_java, sanitize_build_name};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::process::Child;
use tokio::task::JoinHandle;

const GAME_SUBDIRS: [&str; 5] = ["mods", "config", "saves", "resourcepacks", "logs"];

/// Public entry point: sequences resolution, downloads and loader
/// installation for one build and owns the per-build state table.
pub struct BuildOrchestrator {
    config: PipelineConfig,
    layout: DataLayout,
    engine: FetchEngine,
    resolver: VersionResolver,
    states: BuildStateStore,
    // launcher_profiles.json is shared by every build.
    profiles: tokio::sync::Mutex<()>,
    os: OsType,
    arch: Arch,
}

impl BuildOrchestrator {
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let transport = Arc::new(Transport::from_config(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: PipelineConfig, transport: Arc<Transport>) -> Self {
        let layout = DataLayout::new(&config.root_dir);
        let resolver = VersionResolver::new(
            transport.clone(),
            layout.clone(),
            config.endpoints.version_manifest.clone(),
        );
        Self {
            engine: FetchEngine::new(transport, config.download_threads),
            resolver,
            layout,
            states: BuildStateStore::new(),
            profiles: tokio::sync::Mutex::new(()),
            os: OsType::current(),
            arch: Arch::current(),
            config,
        }
    }

    /// Override the platform used for library rules and launch arguments.
    pub fn with_platform(mut self, os: OsType, arch: Arch) -> Self {
        self.os = os;
        self.arch = arch;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn get_build_state(&self, name: &str) -> BuildState {
        self.states.get(&sanitize_build_name(name))
    }

    pub fn build_states(&self) -> Vec<(String, BuildState)> {
        self.states.snapshot()
    }

    /// Run the whole pipeline for `config`.
    ///
    /// A build that is already downloading or installing is rejected. A
    /// build whose persisted record matches `config` and whose files are
    /// still on disk returns immediately without touching the network.
    pub async fn create_build(
        &self,
        config: &BuildConfig,
        progress: &dyn ProgressSink,
        log: &dyn LogSink,
    ) -> PipelineResult<BuildRecord> {
        let key = sanitize_build_name(&config.name);
        if !self.states.try_begin(&key, "Preparing build") {
            log::warn!("Build {} is already in progress", key);
            return Err(PipelineError::Internal(format!(
                "Build {} is already in progress",
                key
            )));
        }

        let reporter = BuildProgress {
            states: &self.states,
            key: &key,
            sink: progress,
            stage: Mutex::new(Stage::Preparing),
        };
        reporter.progress(0, 100, "Preparing build");

        let run = AssertUnwindSafe(self.run_build(&key, config, &reporter, log))
            .catch_unwind()
            .await;

        let stage = reporter.stage();
        match run {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(err)) => {
                self.fail(&key, stage, &err, progress, log);
                Err(err)
            }
            Err(panic) => {
                let err = PipelineError::Internal(panic_message(panic));
                self.fail(&key, stage, &err, progress, log);
                Err(err)
            }
        }
    }

    /// Run [`create_build`](Self::create_build) on its own task.
    pub fn spawn_build(
        self: &Arc<Self>,
        config: BuildConfig,
        progress: Arc<dyn ProgressSink>,
        log: Arc<dyn LogSink>,
    ) -> JoinHandle<PipelineResult<BuildRecord>> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.create_build(&config, progress.as_ref(), log.as_ref())
                .await
        })
    }

    async fn run_build(
        &self,
        key: &str,
        config: &BuildConfig,
        progress: &BuildProgress<'_>,
        log: &dyn LogSink,
    ) -> PipelineResult<BuildRecord> {
        let build_dir = self.layout.instance_dir(key);

        if let Some(mut existing) = BuildRecord::read(&build_dir).await? {
            if existing.matches(config) && existing.is_materialized(&self.layout) {
                log::info!("Build {} is already installed, skipping pipeline", key);
                log.log(&format!("{} is already installed", config.name));
                existing.last_used = Utc::now();
                existing.write(&build_dir).await?;
                self.finish(key, progress);
                return Ok(existing);
            }
            log::info!("Rebuilding {}: stored record differs or files are missing", key);
        }

        progress.enter(Stage::Directories);
        self.create_dirs(key).await?;
        progress.progress(5, 100, "Created directories");

        progress.enter(Stage::Resolving);
        log.log(&format!("Resolving Minecraft {}", config.minecraft_version));
        let descriptor = self.resolver.resolve(&config.minecraft_version).await?;
        progress.progress(10, 100, "Resolved version metadata");

        let ctx = InstallContext {
            game_version: &config.minecraft_version,
            loader_version: config.loader_version.as_deref(),
            layout: &self.layout,
            engine: &self.engine,
            endpoints: &self.config.endpoints,
            os: self.os,
            arch: self.arch,
        };

        progress.enter(Stage::ClientJar);
        log.log("Downloading client jar");
        fetch_client_jar(&ctx, &descriptor, &ScaledProgress::new(progress, 10, 30)).await?;

        if config.loader == LoaderKind::Vanilla {
            progress.enter(Stage::Libraries);
            log.log("Downloading libraries");
            let libraries =
                fetch_base_libraries(&ctx, &descriptor, &ScaledProgress::new(progress, 30, 55), log)
                    .await?;
            log::info!("{} libraries present for {}", libraries, descriptor.id);

            progress.enter(Stage::Assets);
            log.log("Downloading assets");
            let assets =
                fetch_assets(&ctx, &descriptor, &ScaledProgress::new(progress, 55, 75), log).await?;
            log::info!("{} asset objects present for {}", assets, descriptor.id);
        }

        self.states.advance(
            key,
            BuildState::new(BuildStatus::Installing, 75, "Installing loader"),
        );
        progress.sink.progress(75, 100, "Installing loader");

        progress.enter(Stage::Loader);
        let installer = get_installer(config.loader);
        log.log(&format!("Installing {}", installer.kind()));
        let outcome = installer
            .install(&ctx, &ScaledProgress::new(progress, 75, 95), log)
            .await?;

        progress.enter(Stage::Profile);
        progress.progress(95, 100, "Writing launch profile");
        let mut record = BuildRecord::new(config, outcome);
        if let Some(previous) = BuildRecord::read(&build_dir).await? {
            record.created = previous.created;
        }
        {
            let _guard = self.profiles.lock().await;
            write_launch_profile(&self.layout, key, &record, &self.config).await?;
        }
        record.write(&build_dir).await?;

        if record.server_only {
            log.log(&format!("{} is a server distribution", config.name));
        }
        if let Some(artifact) = &record.pending_artifact {
            log.log(&format!("Installer saved to {}", artifact.display()));
        }

        self.finish(key, progress);
        log.log(&format!("{} is ready", config.name));
        Ok(record)
    }

    async fn create_dirs(&self, key: &str) -> PipelineResult<()> {
        let game_dir = self.layout.game_dir(key);
        let mut dirs = vec![
            self.layout.versions_dir(),
            self.layout.libraries_dir(),
            self.layout.assets_dir(),
        ];
        dirs.extend(GAME_SUBDIRS.iter().map(|d| game_dir.join(d)));

        for dir in dirs {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| PipelineError::fs(&dir, e))?;
        }
        Ok(())
    }

    fn finish(&self, key: &str, progress: &BuildProgress<'_>) {
        self.states
            .advance(key, BuildState::new(BuildStatus::Ready, 100, "Ready"));
        progress.sink.progress(100, 100, "Ready");
    }

    /// Full error detail goes to the log facade only; callers see the
    /// failed stage and the error class.
    fn fail(
        &self,
        key: &str,
        stage: Stage,
        err: &PipelineError,
        progress: &dyn ProgressSink,
        log: &dyn LogSink,
    ) {
        log::error!("Build {} failed during {}: {}", key, stage.label(), err);
        let message = user_message(stage, err);
        self.states.advance(key, BuildState::error(&message));
        progress.progress(-1, 100, &message);
        log.log(&format!("Build failed: {}", message));
    }

    /// Remove the build directory, its launcher profile and its state.
    pub async fn delete_build(&self, name: &str) -> PipelineResult<()> {
        let key = sanitize_build_name(name);
        if self.states.get(&key).status.is_active() {
            return Err(PipelineError::Internal(format!(
                "Build {} is in progress and cannot be deleted",
                key
            )));
        }

        let build_dir = self.layout.instance_dir(&key);
        if !build_dir.exists() {
            return Err(PipelineError::NotFound(format!("Build {} does not exist", key)));
        }
        tokio::fs::remove_dir_all(&build_dir)
            .await
            .map_err(|e| PipelineError::fs(&build_dir, e))?;
        {
            let _guard = self.profiles.lock().await;
            remove_launch_profile(&self.layout, &key).await?;
        }
        self.states.clear(&key);
        log::info!("Deleted build {}", key);
        Ok(())
    }

    /// Every persisted build, most recently used first.
    pub async fn list_builds(&self) -> PipelineResult<Vec<BuildRecord>> {
        let dir = self.layout.instances_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PipelineError::fs(&dir, e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::fs(&dir, e))?
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match BuildRecord::read(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable build at {:?}: {}", path, e),
            }
        }
        records.sort_by(|a, b| b.last_used.cmp(&a.last_used));
        Ok(records)
    }

    /// `*.log` files written by the game for this build.
    pub async fn build_logs(&self, name: &str) -> PipelineResult<Vec<PathBuf>> {
        let logs_dir = self.layout.game_dir(&sanitize_build_name(name)).join("logs");
        list_log_files(&logs_dir).await
    }

    pub async fn available_versions(&self) -> PipelineResult<Vec<ManifestEntry>> {
        self.resolver.available_versions().await
    }

    /// Start the periodic cache sweep. `None` when caching is disabled.
    pub fn start_cache_sweeper(&self) -> Option<JoinHandle<()>> {
        let cache = self.engine.transport().cache()?;
        Some(
            Arc::clone(cache)
                .spawn_sweeper(self.config.sweep_interval(), self.config.cache_ttl()),
        )
    }

    /// Assemble the launch command for an installed client build.
    pub async fn prepare_launch(
        &self,
        name: &str,
        player_name: &str,
    ) -> PipelineResult<ResolvedInstance> {
        let key = sanitize_build_name(name);
        let build_dir = self.layout.instance_dir(&key);
        let mut record = BuildRecord::read(&build_dir)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Build {} does not exist", key)))?;

        if record.server_only {
            return Err(PipelineError::Internal(format!(
                "{} is a {} server and cannot be launched as a client",
                key, record.loader
            )));
        }
        if let Some(artifact) = &record.pending_artifact {
            return Err(PipelineError::NotFound(format!(
                "{} has not been installed yet, run the installer at {}",
                record.version_id,
                artifact.display()
            )));
        }

        let descriptor = resolve_version_chain(&self.layout, &record.version_id).await?;
        let mut request = LaunchRequest::new(player_name, self.layout.game_dir(&key));
        request.max_memory_mb = self.config.max_memory_mb;
        request.min_memory_mb = self.config.min_memory_mb;

        let assembler = LaunchAssembler::for_platform(
            self.layout.clone(),
            self.config.endpoints.libraries.clone(),
            self.os,
            self.arch,
        );
        let resolved = assembler.assemble(&descriptor, &request)?;

        record.last_used = Utc::now();
        record.write(&build_dir).await?;
        {
            let _guard = self.profiles.lock().await;
            write_launch_profile(&self.layout, &key, &record, &self.config).await?;
        }
        Ok(resolved)
    }

    /// Assemble and start the game for `name`, forwarding its output to `log`.
    pub async fn launch_build(
        &self,
        name: &str,
        player_name: &str,
        log: Arc<dyn LogSink>,
    ) -> PipelineResult<Child> {
        let resolved = self.prepare_launch(name, player_name).await?;
        let java = locate_java(&self.config.java_path)
            .map_err(|e| PipelineError::NotFound(format!("{:#}", e)))?;
        let game_dir = self.layout.game_dir(&sanitize_build_name(name));
        launcher::launch(&resolved, &java, &game_dir, log)
            .await
            .map_err(|e| PipelineError::Internal(format!("{:#}", e)))
    }
}

async fn list_log_files(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PipelineError::fs(dir, e)),
    };

    let mut logs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PipelineError::fs(dir, e))?
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            logs.push(path);
        }
    }
    logs.sort();
    Ok(logs)
}

/// Pipeline step a build is in, used to word failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Preparing,
    Directories,
    Resolving,
    ClientJar,
    Libraries,
    Assets,
    Loader,
    Profile,
}

impl Stage {
    fn label(&self) -> &'static str {
        match self {
            Stage::Preparing => "Preparation",
            Stage::Directories => "Directory setup",
            Stage::Resolving => "Version lookup",
            Stage::ClientJar => "Client download",
            Stage::Libraries => "Library download",
            Stage::Assets => "Asset download",
            Stage::Loader => "Loader installation",
            Stage::Profile => "Profile setup",
        }
    }
}

fn user_message(stage: Stage, err: &PipelineError) -> String {
    let cause = match err.kind() {
        ErrorKind::Network => "network error",
        ErrorKind::NotFound => "the requested version was not found",
        ErrorKind::Filesystem => "could not write to the game directory",
        ErrorKind::Internal => "internal error",
    };
    format!("{} failed: {}", stage.label(), cause)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("Unexpected fault: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("Unexpected fault: {}", s)
    } else {
        "Unexpected fault".to_string()
    }
}

/// Mirrors overall progress into the state table before forwarding it.
struct BuildProgress<'a> {
    states: &'a BuildStateStore,
    key: &'a str,
    sink: &'a dyn ProgressSink,
    stage: Mutex<Stage>,
}

impl BuildProgress<'_> {
    fn enter(&self, stage: Stage) {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner()) = stage;
    }

    fn stage(&self) -> Stage {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProgressSink for BuildProgress<'_> {
    fn progress(&self, current: i64, total: i64, message: &str) {
        // Failures are reported once, by `fail`.
        if current < 0 {
            return;
        }
        let percent = if total > 0 {
            (current.min(total) * 100 / total) as i32
        } else {
            current.clamp(0, 100) as i32
        };
        self.states.set_progress(self.key, percent, message);
        self.sink.progress(percent as i64, 100, message);
    }
}
