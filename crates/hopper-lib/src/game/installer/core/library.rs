use crate::error::PipelineError;
use crate::game::installer::core::batch::{FetchItem, FetchReport};
use crate::game::installer::core::traits::InstallContext;
use crate::game::installer::types::{Arch, LogSink, OsType, ProgressSink};
use crate::game::launcher::rules::is_library_needed;
use crate::game::launcher::version_parser::LibraryEntry;
use std::path::Path;

/// Fetch items for every library needed on this platform.
pub fn library_fetch_items(
    libraries: &[LibraryEntry],
    libraries_dir: &Path,
    default_repo: &str,
    os: OsType,
    arch: Arch,
) -> Vec<FetchItem> {
    let mut items = Vec::new();
    for library in libraries {
        if !is_library_needed(library, os, arch) {
            log::debug!("Skipping library (rules): {}", library.name);
            continue;
        }
        match library.location(default_repo) {
            Some(loc) => items.push(
                FetchItem::new(loc.url, libraries_dir.join(&loc.path))
                    .with_sha1(loc.sha1)
                    .with_label(library.name.clone()),
            ),
            None => log::warn!("Skipping library with invalid coordinates: {}", library.name),
        }
    }
    items
}

/// Download a library list, failing if any artifact failed.
pub async fn fetch_libraries(
    ctx: &InstallContext<'_>,
    libraries: &[LibraryEntry],
    default_repo: &str,
    progress: &dyn ProgressSink,
    log: &dyn LogSink,
) -> Result<FetchReport, PipelineError> {
    let items = library_fetch_items(
        libraries,
        &ctx.layout.libraries_dir(),
        default_repo,
        ctx.os,
        ctx.arch,
    );
    log::info!("Fetching {} libraries", items.len());
    let report = ctx.engine.fetch_all(items, progress, log).await;
    report_to_result(report)
}

/// Collapse a partial failure into one network-class error.
pub fn report_to_result(report: FetchReport) -> Result<FetchReport, PipelineError> {
    if report.all_succeeded() {
        return Ok(report);
    }
    let url = report
        .failed
        .first()
        .map(|f| f.url.clone())
        .unwrap_or_default();
    Err(PipelineError::Network {
        url,
        message: report.failure_summary(),
    })
}
