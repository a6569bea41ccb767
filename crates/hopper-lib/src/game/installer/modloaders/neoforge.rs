use super::forge::fetch_installer_jar;
use crate::error::PipelineResult;
use crate::game::installer::core::traits::{InstallContext, InstallOutcome, LoaderInstaller};
use crate::game::installer::types::{LogSink, ProgressSink};
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;

pub struct NeoForgeInstaller;

impl LoaderInstaller for NeoForgeInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::NeoForge
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(async move {
            // NeoForge versions already encode the game version (e.g. 20.4.237).
            let loader_version = ctx.require_loader_version(LoaderKind::NeoForge)?;
            let url = format!(
                "{}/net/neoforged/neoforge/{}/neoforge-{}-installer.jar",
                ctx.endpoints.neoforge_maven.trim_end_matches('/'),
                loader_version,
                loader_version
            );
            let file_name = format!("neoforge-{}-installer.jar", loader_version);
            fetch_installer_jar(
                ctx,
                LoaderKind::NeoForge,
                loader_version,
                &url,
                &file_name,
                progress,
                log,
            )
            .await
        })
    }
}
