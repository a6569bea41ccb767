use crate::game::installer::types::LogSink;
use crate::game::launcher::classpath::validate_classpath;
use crate::game::launcher::ResolvedInstance;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Start the game and forward its output to `log` line by line.
///
/// The caller owns the returned child; waiting on it or dropping it is up to them.
pub async fn launch(
    resolved: &ResolvedInstance,
    java: &Path,
    working_dir: &Path,
    log: Arc<dyn LogSink>,
) -> Result<Child> {
    if let Err(missing) = validate_classpath(&resolved.classpath) {
        for err in &missing {
            log::warn!("{}", err);
        }
        log.log(&format!("{} classpath entries are missing", missing.len()));
    }

    let argv = resolved.command(java);
    spawn_forwarding(&argv, working_dir, log).await
}

/// Spawn `argv` with piped output; each stdout/stderr line goes to `log`.
pub async fn spawn_forwarding(argv: &[String], working_dir: &Path, log: Arc<dyn LogSink>) -> Result<Child> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("Empty command line"))?;

    tokio::fs::create_dir_all(working_dir)
        .await
        .with_context(|| format!("Failed to create working directory {:?}", working_dir))?;

    log::info!("Launching: {} ({} args)", program, args.len());
    log::debug!("Full command: {:?}", argv);

    let mut child = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;

    log::info!("Game process started with PID: {:?}", child.id());

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, log.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, log);
    }

    Ok(child)
}

fn forward_lines<R>(stream: R, log: Arc<dyn LogSink>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log.log(&line);
        }
    });
}
