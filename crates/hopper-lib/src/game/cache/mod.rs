//! TTL-based blob store keyed by source URL.
//!
//! Every key maps to exactly one file. Writes go through a temporary file in
//! the same directory that is renamed into place, so a reader never observes
//! a half-written entry. Expiry is lazy: an expired entry is removed by the
//! lookup that finds it, and the optional sweeper bounds growth of entries
//! nobody asks for again.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tokio::task::JoinHandle;

use crate::error::{PipelineError, PipelineResult};

const PREFIX_LIMIT: usize = 64;
const STAGING_DIR: &str = ".staging";

#[derive(Debug)]
pub struct Cache {
    dir: PathBuf,
    default_ttl: Duration,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            default_ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// File-system token for a key: a readable prefix plus a SHA-256 digest.
    pub fn key_token(key: &str) -> String {
        let readable: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .take(PREFIX_LIMIT)
            .collect();
        let digest = Sha256::digest(key.as_bytes());
        format!("{}-{:x}", readable, digest)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(Self::key_token(key))
    }

    /// Returns true when a live entry exists. An expired entry is deleted.
    /// `ttl` of `None` uses the cache default.
    pub fn has(&self, key: &str, ttl: Option<Duration>) -> bool {
        let path = self.entry_path(key);
        let ttl = ttl.unwrap_or(self.default_ttl);

        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };

        if is_expired(modified, ttl) {
            log::debug!("Cache entry expired, evicting: {}", key);
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to evict cache entry {:?}: {}", path, e);
                }
            }
            return false;
        }
        true
    }

    pub fn get(&self, key: &str, ttl: Option<Duration>) -> Option<Vec<u8>> {
        if !self.has(key, ttl) {
            return None;
        }
        // The sweeper may have removed the entry since the check.
        match std::fs::read(self.entry_path(key)) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::debug!("Cache read miss for {}: {}", key, e);
                None
            }
        }
    }

    pub fn set(&self, key: &str, bytes: &[u8]) -> PipelineResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PipelineError::fs(&self.dir, e))?;
        let path = self.entry_path(key);

        let mut tmp = self.stage()?;
        tmp.write_all(bytes).map_err(|e| PipelineError::fs(&path, e))?;
        tmp.flush().map_err(|e| PipelineError::fs(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| PipelineError::fs(&path, e.error))?;

        log::debug!("Cached {} bytes for {}", bytes.len(), key);
        Ok(())
    }

    /// Temporary file for an in-flight write. Lives in a subdirectory so a
    /// concurrent sweep, which only removes top-level files, never sees it.
    fn stage(&self) -> PipelineResult<NamedTempFile> {
        let staging = self.dir.join(STAGING_DIR);
        std::fs::create_dir_all(&staging).map_err(|e| PipelineError::fs(&staging, e))?;
        NamedTempFile::new_in(&staging).map_err(|e| PipelineError::fs(&staging, e))
    }

    pub fn clear(&self) -> PipelineResult<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir).map_err(|e| PipelineError::fs(&self.dir, e))?;
        }
        std::fs::create_dir_all(&self.dir).map_err(|e| PipelineError::fs(&self.dir, e))?;
        log::info!("Cache cleared: {:?}", self.dir);
        Ok(())
    }

    /// Remove every entry older than `max_age`. Returns the number removed.
    /// In-flight writes under the staging directory are left alone.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if !path.is_file() || !is_expired(modified, max_age) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Cache sweep could not remove {:?}: {}", path, e),
            }
        }

        if removed > 0 {
            log::info!("Cache sweep removed {} stale entries", removed);
        }
        removed
    }

    /// Sweep with `max_age` every `interval`, starting one interval from now.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                let cache = self.clone();
                match tokio::task::spawn_blocking(move || cache.sweep(max_age)).await {
                    Ok(n) => log::debug!("Scheduled cache sweep done ({} removed)", n),
                    Err(e) => log::error!("Cache sweep task failed: {}", e),
                }
            }
        })
    }
}

fn is_expired(modified: SystemTime, ttl: Duration) -> bool {
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    age >= ttl
}
