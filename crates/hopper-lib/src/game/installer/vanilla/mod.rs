//! Base-version downloads (client jar, libraries, assets) and the no-op
//! vanilla loader.

use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::batch::FetchItem;
use crate::game::installer::core::library::{fetch_libraries, report_to_result};
use crate::game::installer::core::traits::{InstallContext, InstallOutcome, LoaderInstaller};
use crate::game::installer::types::{LogSink, NullSink, ProgressSink};
use crate::game::launcher::version_parser::{AssetIndexDocument, VersionDescriptor};
use crate::game::metadata::LoaderKind;
use futures::future::BoxFuture;
use std::collections::HashSet;
use std::path::PathBuf;

pub struct VanillaInstaller;

impl LoaderInstaller for VanillaInstaller {
    fn kind(&self) -> LoaderKind {
        LoaderKind::Vanilla
    }

    fn install<'a>(
        &'a self,
        ctx: &'a InstallContext<'a>,
        progress: &'a dyn ProgressSink,
        _log: &'a dyn LogSink,
    ) -> BoxFuture<'a, PipelineResult<InstallOutcome>> {
        Box::pin(async move {
            progress.progress(100, 100, "Vanilla needs no loader");
            Ok(InstallOutcome::client(ctx.game_version))
        })
    }
}

/// Download `versions/<id>/<id>.jar`.
pub async fn fetch_client_jar(
    ctx: &InstallContext<'_>,
    descriptor: &VersionDescriptor,
    progress: &dyn ProgressSink,
) -> PipelineResult<PathBuf> {
    let client = descriptor
        .downloads
        .as_ref()
        .and_then(|d| d.client.as_ref())
        .ok_or_else(|| {
            PipelineError::malformed(
                format!("version {}", descriptor.id),
                "missing downloads.client",
            )
        })?;

    let dest = ctx.layout.version_jar(&descriptor.id);
    log::info!("Fetching client jar for {}", descriptor.id);
    ctx.engine
        .transport()
        .fetch(&client.url, &dest, client.sha1.as_deref(), Some(progress))
        .await?;
    Ok(dest)
}

/// Download the libraries the base version declares for this platform.
pub async fn fetch_base_libraries(
    ctx: &InstallContext<'_>,
    descriptor: &VersionDescriptor,
    progress: &dyn ProgressSink,
    log: &dyn LogSink,
) -> PipelineResult<usize> {
    let report = fetch_libraries(
        ctx,
        &descriptor.libraries,
        &ctx.endpoints.libraries,
        progress,
        log,
    )
    .await?;
    Ok(report.total)
}

/// Download the asset index and every object it lists.
pub async fn fetch_assets(
    ctx: &InstallContext<'_>,
    descriptor: &VersionDescriptor,
    progress: &dyn ProgressSink,
    log: &dyn LogSink,
) -> PipelineResult<usize> {
    let Some(index_ref) = &descriptor.asset_index else {
        log::warn!("Version {} declares no asset index", descriptor.id);
        progress.progress(100, 100, "No assets");
        return Ok(0);
    };

    let index_path = ctx.layout.asset_index(&index_ref.id);
    ctx.engine
        .transport()
        .fetch(&index_ref.url, &index_path, index_ref.sha1.as_deref(), Some(&NullSink))
        .await?;

    let raw = tokio::fs::read(&index_path)
        .await
        .map_err(|e| PipelineError::fs(&index_path, e))?;
    let index: AssetIndexDocument = serde_json::from_slice(&raw)
        .map_err(|e| PipelineError::malformed(format!("asset index {}", index_ref.id), e))?;

    let base = ctx.endpoints.resources.trim_end_matches('/');
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (name, object) in &index.objects {
        let Some(prefix) = object.hash.get(..2) else {
            log::warn!("Skipping asset {} with invalid hash {:?}", name, object.hash);
            continue;
        };
        if !seen.insert(object.hash.clone()) {
            continue;
        }
        items.push(
            FetchItem::new(
                format!("{}/{}/{}", base, prefix, object.hash),
                ctx.layout.asset_object(&object.hash),
            )
            .with_sha1(Some(object.hash.clone()))
            .with_label(name.clone()),
        );
    }

    log::info!(
        "Fetching {} asset objects for index {}",
        items.len(),
        index_ref.id
    );
    let report = ctx.engine.fetch_all(items, progress, log).await;
    Ok(report_to_result(report)?.total)
}
