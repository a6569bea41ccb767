//! Persisted build documents: `instance.json` inside each build directory
//! and the shared `launcher_profiles.json`.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::traits::InstallOutcome;
use crate::game::installer::types::DataLayout;
use crate::game::metadata::LoaderKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const RECORD_FILE: &str = "instance.json";

/// What the caller asks `create_build` for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub name: String,
    pub minecraft_version: String,
    #[serde(default = "default_loader")]
    pub loader: LoaderKind,
    #[serde(default)]
    pub loader_version: Option<String>,
    #[serde(default)]
    pub notes: String,
}

fn default_loader() -> LoaderKind {
    LoaderKind::Vanilla
}

impl BuildConfig {
    pub fn vanilla(name: impl Into<String>, minecraft_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            minecraft_version: minecraft_version.into(),
            loader: LoaderKind::Vanilla,
            loader_version: None,
            notes: String::new(),
        }
    }

    pub fn with_loader(mut self, loader: LoaderKind, version: impl Into<String>) -> Self {
        self.loader = loader;
        self.loader_version = Some(version.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    pub minecraft_version: String,
    pub loader: LoaderKind,
    #[serde(default)]
    pub loader_version: Option<String>,
    pub created: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    /// Launchable id under `versions/`.
    pub version_id: String,
    #[serde(default)]
    pub server_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_artifact: Option<PathBuf>,
}

impl BuildRecord {
    pub fn new(config: &BuildConfig, outcome: InstallOutcome) -> Self {
        let now = Utc::now();
        Self {
            name: config.name.clone(),
            minecraft_version: config.minecraft_version.clone(),
            loader: config.loader,
            loader_version: config.loader_version.clone(),
            created: now,
            last_used: now,
            notes: config.notes.clone(),
            version_id: outcome.version_id,
            server_only: outcome.server_only,
            pending_artifact: outcome.pending_artifact,
        }
    }

    /// Same target as `config` (notes and display name aside).
    pub fn matches(&self, config: &BuildConfig) -> bool {
        self.minecraft_version == config.minecraft_version
            && self.loader == config.loader
            && self.loader_version == config.loader_version
    }

    /// Whether every artifact the build produced is still on disk.
    pub fn is_materialized(&self, layout: &DataLayout) -> bool {
        if !layout.version_jar(&self.minecraft_version).exists()
            || !layout.version_json(&self.minecraft_version).exists()
        {
            return false;
        }
        if let Some(artifact) = &self.pending_artifact {
            return artifact.exists();
        }
        if self.server_only {
            return layout.version_jar(&self.version_id).exists();
        }
        layout.version_json(&self.version_id).exists()
    }

    pub async fn read(build_dir: &Path) -> PipelineResult<Option<Self>> {
        let path = build_dir.join(RECORD_FILE);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipelineError::fs(&path, e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| PipelineError::malformed(path.display().to_string(), e))
    }

    pub async fn write(&self, build_dir: &Path) -> PipelineResult<()> {
        let path = build_dir.join(RECORD_FILE);
        let body = serde_json::to_vec_pretty(self)
            .map_err(|e| PipelineError::Internal(format!("Failed to encode build record: {}", e)))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| PipelineError::fs(&path, e))
    }
}

/// Insert or replace the launcher profile entry for `key`.
///
/// The file is shared by every build; callers serialize updates.
pub async fn write_launch_profile(
    layout: &DataLayout,
    key: &str,
    record: &BuildRecord,
    config: &PipelineConfig,
) -> PipelineResult<()> {
    let path = layout.launcher_profiles();
    let mut doc = read_profiles(&path).await?;

    let entry = json!({
        "name": record.name,
        "type": "custom",
        "created": record.created.to_rfc3339(),
        "lastUsed": record.last_used.to_rfc3339(),
        "icon": "Grass",
        "lastVersionId": record.version_id,
        "gameDir": layout.game_dir(key).to_string_lossy(),
        "javaArgs": format!("-Xmx{}M -Xms{}M", config.max_memory_mb, config.min_memory_mb),
    });
    let mut profiles = take_profiles(&mut doc);
    profiles.insert(key.to_string(), entry);
    doc.insert("profiles".to_string(), Value::Object(profiles));
    write_profiles(&path, &doc).await
}

pub async fn remove_launch_profile(layout: &DataLayout, key: &str) -> PipelineResult<()> {
    let path = layout.launcher_profiles();
    if !path.exists() {
        return Ok(());
    }
    let mut doc = read_profiles(&path).await?;
    let mut profiles = take_profiles(&mut doc);
    let removed = profiles.remove(key).is_some();
    doc.insert("profiles".to_string(), Value::Object(profiles));
    if removed {
        write_profiles(&path, &doc).await?;
    }
    Ok(())
}

async fn read_profiles(path: &Path) -> PipelineResult<Map<String, Value>> {
    match tokio::fs::read(path).await {
        Ok(raw) => match serde_json::from_slice::<Value>(&raw) {
            Ok(Value::Object(doc)) => Ok(doc),
            _ => {
                log::warn!("Replacing unreadable launcher profiles at {:?}", path);
                Ok(Map::new())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
        Err(e) => Err(PipelineError::fs(path, e)),
    }
}

fn take_profiles(doc: &mut Map<String, Value>) -> Map<String, Value> {
    match doc.remove("profiles") {
        Some(Value::Object(profiles)) => profiles,
        _ => Map::new(),
    }
}

async fn write_profiles(path: &Path, doc: &Map<String, Value>) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::fs(parent, e))?;
    }
    let body = serde_json::to_vec_pretty(doc)
        .map_err(|e| PipelineError::Internal(format!("Failed to encode launcher profiles: {}", e)))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::fs(dir, e))?;
    tmp.write_all(&body).map_err(|e| PipelineError::fs(path, e))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::fs(path, e.error))?;
    Ok(())
}
