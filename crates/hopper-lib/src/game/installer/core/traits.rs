use crate::config::Endpoints;
use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::batch::FetchEngine;
use crate::game::installer::types::{Arch, DataLayout, LogSink, OsType, ProgressSink};
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;
use std::path::PathBuf;

/// Everything an installer needs for one build.
pub struct InstallContext<'a> {
    pub game_version: &'a str,
    pub loader_version: Option<&'a str>,
    pub layout: &'a DataLayout,
    pub engine: &'a FetchEngine,
    pub endpoints: &'a Endpoints,
    pub os: OsType,
    pub arch: Arch,
}

impl InstallContext<'_> {
    pub fn require_loader_version(&self, loader: LoaderKind) -> PipelineResult<&str> {
        self.loader_version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PipelineError::NotFound(format!("No {} version specified", loader)))
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    /// Directory name under `versions/` used to launch the build.
    pub version_id: String,
    /// Server distributions cannot be launched as a client.
    pub server_only: bool,
    /// Downloaded artifact that still needs a follow-on step (installer jars).
    pub pending_artifact: Option<PathBuf>,
}

impl InstallOutcome {
    pub fn client(version_id: impl Into<String>) -> Self {
        Self {
            version_id: version_id.into(),
            server_only: false,
            pending_artifact: None,
        }
    }
}

/// One implementation per loader family, selected by [`LoaderKind`].
pub trait LoaderInstaller: Send + Sync {
    fn kind(&self) -> LoaderKind;

    /// Install the loader overlay. Progress is reported on a 0-100 scale.
    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>>;
}

/// On-disk id for a loader profile, e.g. "fabric-loader-0.14.21-1.20.1".
pub fn installed_version_id(loader: LoaderKind, loader_version: &str, game_version: &str) -> String {
    format!("{}-loader-{}-{}", loader.as_str(), loader_version, game_version)
}
