use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::library::fetch_libraries;
use crate::game::installer::core::traits::{
    installed_version_id, InstallContext, InstallOutcome, LoaderInstaller,
};
use crate::game::installer::types::{LogSink, ProgressSink, ScaledProgress};
use crate::game::launcher::version_parser::parse_descriptor;
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;

pub struct FabricInstaller;

impl LoaderInstaller for FabricInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Fabric
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(install_profile_loader(
            ctx,
            LoaderKind::Fabric,
            &ctx.endpoints.fabric_meta,
            &ctx.endpoints.fabric_maven,
            progress,
            log,
        ))
    }
}

/// Install a loader that publishes a ready-made launch profile
/// (Fabric and Quilt share this flow, only the endpoints differ).
///
/// The profile is stored verbatim as `versions/<id>/<id>.json`, then its
/// libraries are fetched for the current platform.
pub async fn install_profile_loader(
    ctx: &InstallContext<'_>,
    loader: LoaderKind,
    meta_url: &str,
    maven_url: &str,
    progress: &dyn ProgressSink,
    log: &dyn LogSink,
) -> PipelineResult<InstallOutcome> {
    let loader_version = ctx.require_loader_version(loader)?;
    log::info!(
        "Installing {} {} for Minecraft {}",
        loader,
        loader_version,
        ctx.game_version
    );
    progress.progress(0, 100, &format!("Fetching {} profile", loader));

    let profile_url = format!(
        "{}/{}/{}/profile/json",
        meta_url.trim_end_matches('/'),
        ctx.game_version,
        loader_version
    );
    let bytes = ctx
        .engine
        .transport()
        .fetch_bytes(&profile_url)
        .await
        .map_err(|e| match e {
            // The meta services answer unknown versions with 400/404.
            PipelineError::HttpStatus { status: 400 | 404, .. } => PipelineError::NotFound(format!(
                "{} {} is not available for Minecraft {}",
                loader, loader_version, ctx.game_version
            )),
            other => other,
        })?;
    let profile = parse_descriptor(&bytes, &profile_url)?;

    let version_id = installed_version_id(loader, loader_version, ctx.game_version);
    let version_dir = ctx.layout.version_dir(&version_id);
    tokio::fs::create_dir_all(&version_dir)
        .await
        .map_err(|e| PipelineError::fs(&version_dir, e))?;
    let profile_path = ctx.layout.version_json(&version_id);
    tokio::fs::write(&profile_path, &bytes)
        .await
        .map_err(|e| PipelineError::fs(&profile_path, e))?;
    log.log(&format!("Saved {} profile {}", loader, version_id));
    progress.progress(10, 100, &format!("Saved {} profile", loader));

    let scaled = ScaledProgress::new(progress, 10, 100);
    let report = fetch_libraries(ctx, &profile.libraries, maven_url, &scaled, log).await?;
    log.log(&format!("{} libraries ready ({})", loader, report.total));

    progress.progress(100, 100, &format!("{} installed", loader));
    Ok(InstallOutcome::client(version_id))
}
