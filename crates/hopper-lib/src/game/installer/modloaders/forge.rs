use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::traits::{
    installed_version_id, InstallContext, InstallOutcome, LoaderInstaller,
};
use crate::game::installer::types::{LogSink, ProgressSink};
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;

pub struct ForgeInstaller;

impl LoaderInstaller for ForgeInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Forge
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(async move {
            let loader_version = ctx.require_loader_version(LoaderKind::Forge)?;
            let coordinate = format!("{}-{}", ctx.game_version, loader_version);
            let url = format!(
                "{}/net/minecraftforge/forge/{}/forge-{}-installer.jar",
                ctx.endpoints.forge_maven.trim_end_matches('/'),
                coordinate,
                coordinate
            );
            let file_name = format!("forge-{}-installer.jar", coordinate);
            fetch_installer_jar(ctx, LoaderKind::Forge, loader_version, &url, &file_name, progress, log)
                .await
        })
    }
}

/// Download a loader's installer jar into `<root>/installers/`.
///
/// Running the installer (processors, patching) is a separate step; the
/// outcome carries the jar as a pending artifact.
pub(crate) async fn fetch_installer_jar(
    ctx: &InstallContext<'_>,
    loader: LoaderKind,
    loader_version: &str,
    url: &str,
    file_name: &str,
    progress: &dyn ProgressSink,
    log: &dyn LogSink,
) -> PipelineResult<InstallOutcome> {
    log::info!(
        "Fetching {} {} installer for Minecraft {}",
        loader,
        loader_version,
        ctx.game_version
    );
    let dest = ctx.layout.installers_dir().join(file_name);

    ctx.engine
        .transport()
        .fetch(url, &dest, None, Some(progress))
        .await
        .map_err(|e| match e {
            PipelineError::HttpStatus { status: 404, .. } => PipelineError::NotFound(format!(
                "{} {} installer not found for Minecraft {}",
                loader, loader_version, ctx.game_version
            )),
            other => other,
        })?;

    log.log(&format!("Downloaded {} installer to {}", loader, dest.display()));
    Ok(InstallOutcome {
        version_id: installed_version_id(loader, loader_version, ctx.game_version),
        server_only: false,
        pending_artifact: Some(dest),
    })
}
