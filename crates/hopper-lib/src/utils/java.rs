use anyhow::{Context, Result};
use std::path::PathBuf;

/// Resolve the java executable. `"auto"` (or empty) checks `JAVA_HOME`
/// and then `PATH`; anything else is a path or a command name.
pub fn locate_java(configured: &str) -> Result<PathBuf> {
    let configured = configured.trim();
    if !configured.is_empty() && configured != "auto" {
        let candidate = PathBuf::from(configured);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return which::which(configured)
            .with_context(|| format!("Configured java not found: {}", configured));
    }

    if let Some(home) = std::env::var_os("JAVA_HOME") {
        let bin = PathBuf::from(home).join("bin").join(java_binary());
        if bin.is_file() {
            log::debug!("Using java from JAVA_HOME: {:?}", bin);
            return Ok(bin);
        }
    }

    which::which("java").context("No java executable found on PATH")
}

fn java_binary() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}
