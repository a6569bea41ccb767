use super::fabric::install_profile_loader;
use crate::error::PipelineResult;
use crate::game::installer::core::traits::{InstallContext, InstallOutcome, LoaderInstaller};
use crate::game::installer::types::{LogSink, ProgressSink};
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;

/// Quilt uses the same installation process as Fabric, just with different endpoints
pub struct QuiltInstaller;

impl LoaderInstaller for QuiltInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Quilt
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(install_profile_loader(
            ctx,
            LoaderKind::Quilt,
            &ctx.endpoints.quilt_meta,
            &ctx.endpoints.quilt_maven,
            progress,
            log,
        ))
    }
}
