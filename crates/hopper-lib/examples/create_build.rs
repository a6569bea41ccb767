use std::path::PathBuf;

use anyhow::Result;
use hopper_lib::{BuildConfig, BuildOrchestrator, LoaderKind, LogSink, PipelineConfig, ProgressSink};

struct ConsoleReporter;

impl ProgressSink for ConsoleReporter {
    fn progress(&self, current: i64, total: i64, message: &str) {
        if current < 0 {
            println!("[FAILED] {}", message);
        } else {
            println!("[PROGRESS] {}/{} {}", current, total, message);
        }
    }
}

impl LogSink for ConsoleReporter {
    fn log(&self, line: &str) {
        println!("[LOG] {}", line);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // Usage: create_build <game version> [loader] [loader version]
    let mut args = std::env::args().skip(1);
    let game_version = args.next().unwrap_or_else(|| "1.20.1".to_string());
    let loader: LoaderKind = match args.next() {
        Some(name) => name.parse()?,
        None => LoaderKind::Vanilla,
    };
    let loader_version = args.next();

    // Downloads real artifacts, so keep them out of the user's game directory.
    let tmp = tempfile::tempdir()?;
    let root: PathBuf = tmp.path().join("data");
    let config = PipelineConfig::with_root(&root);

    let orchestrator = BuildOrchestrator::new(config)?;
    let build = BuildConfig {
        name: format!("Example {} {}", loader, game_version),
        minecraft_version: game_version,
        loader,
        loader_version,
        notes: String::new(),
    };

    let record = orchestrator
        .create_build(&build, &ConsoleReporter, &ConsoleReporter)
        .await?;
    println!("Installed {} into {:?}", record.version_id, root);

    if !record.server_only && record.pending_artifact.is_none() {
        let resolved = orchestrator.prepare_launch(&record.name, "Player").await?;
        println!("Main class: {}", resolved.main_class);
        println!("Classpath entries: {}", resolved.classpath.len());
    }
    Ok(())
}
