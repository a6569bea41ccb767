//! Prebuilt server distributions (Paper, Purpur).
//!
//! The loader version is the build number. These builds are server-only:
//! they carry no client and no mod loader.

use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::traits::{InstallContext, InstallOutcome, LoaderInstaller};
use crate::game::installer::types::{LogSink, ProgressSink};
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;

pub struct PaperInstaller;
pub struct PurpurInstaller;

impl LoaderInstaller for PaperInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Paper
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(async move {
            let build = ctx.require_loader_version(LoaderKind::Paper)?;
            let url = format!(
                "{}/versions/{mc}/builds/{b}/downloads/paper-{mc}-{b}.jar",
                ctx.endpoints.paper_api.trim_end_matches('/'),
                mc = ctx.game_version,
                b = build
            );
            fetch_server_jar(ctx, LoaderKind::Paper, build, &url, progress, log).await
        })
    }
}

impl LoaderInstaller for PurpurInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Purpur
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(async move {
            let build = ctx.require_loader_version(LoaderKind::Purpur)?;
            let url = format!(
                "{}/{}/{}/download",
                ctx.endpoints.purpur_api.trim_end_matches('/'),
                ctx.game_version,
                build
            );
            fetch_server_jar(ctx, LoaderKind::Purpur, build, &url, progress, log).await
        })
    }
}

/// Server jars live at `versions/<loader>-<mc>-<build>/<same>.jar`.
pub fn server_version_id(loader: LoaderKind, game_version: &str, build: &str) -> String {
    format!("{}-{}-{}", loader.as_str(), game_version, build)
}

async fn fetch_server_jar(
    ctx: &InstallContext<'_>,
    loader: LoaderKind,
    build: &str,
    url: &str,
    progress: &dyn ProgressSink,
    log: &dyn LogSink,
) -> PipelineResult<InstallOutcome> {
    let version_id = server_version_id(loader, ctx.game_version, build);
    let dest = ctx.layout.version_jar(&version_id);
    log::info!("Fetching {} server jar {} from {}", loader, version_id, url);

    ctx.engine
        .transport()
        .fetch(url, &dest, None, Some(progress))
        .await
        .map_err(|e| match e {
            PipelineError::HttpStatus { status: 404, .. } => PipelineError::NotFound(format!(
                "{} build {} not found for Minecraft {}",
                loader, build, ctx.game_version
            )),
            other => other,
        })?;

    log.log(&format!("{} is server-only: mods are not supported", version_id));
    Ok(InstallOutcome {
        version_id,
        server_only: true,
        pending_artifact: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_ids() {
        assert_eq!(server_version_id(LoaderKind::Paper, "1.20.1", "196"), "paper-1.20.1-196");
        assert_eq!(server_version_id(LoaderKind::Purpur, "1.20.1", "2062"), "purpur-1.20.1-2062");
    }
}
