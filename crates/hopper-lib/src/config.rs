//! Pipeline settings, persisted as a small JSON document.

use crate::game::installer::config::{
    DEFAULT_ATTEMPTS, DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_RETRY_DELAY_SECS, FABRIC_MAVEN_URL,
    FABRIC_META_URL, FORGE_MAVEN_URL, LIBRARIES_URL, NEOFORGE_MAVEN_URL, PAPER_API_URL,
    PURPUR_API_URL, QUILT_MAVEN_URL, QUILT_META_URL, RESOURCES_URL, VANILLA_MANIFEST_URL,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Data root holding `versions/`, `libraries/`, `assets/` and `instances/`.
    pub root_dir: PathBuf,
    pub download_threads: usize,
    pub use_cache: bool,
    pub cache_ttl_secs: u64,
    pub cache_sweep_interval_secs: u64,
    pub max_memory_mb: u32,
    pub min_memory_mb: u32,
    /// `"auto"` or an explicit path to a java executable.
    pub java_path: String,
    pub transport: TransportConfig,
    pub endpoints: Endpoints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            download_threads: 8,
            use_cache: true,
            cache_ttl_secs: 3600,
            cache_sweep_interval_secs: 2 * 60 * 60,
            max_memory_mb: 2048,
            min_memory_mb: 512,
            java_path: "auto".to_string(),
            transport: TransportConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config
            .endpoints
            .validate()
            .with_context(|| format!("Invalid endpoints in {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub attempts: u32,
    pub attempt_timeout_secs: u64,
    pub retry_delay_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT_SECS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

/// Remote services the pipeline talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub version_manifest: String,
    pub fabric_meta: String,
    pub fabric_maven: String,
    pub quilt_meta: String,
    pub quilt_maven: String,
    pub forge_maven: String,
    pub neoforge_maven: String,
    pub paper_api: String,
    pub purpur_api: String,
    pub libraries: String,
    pub resources: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_manifest: VANILLA_MANIFEST_URL.to_string(),
            fabric_meta: FABRIC_META_URL.to_string(),
            fabric_maven: FABRIC_MAVEN_URL.to_string(),
            quilt_meta: QUILT_META_URL.to_string(),
            quilt_maven: QUILT_MAVEN_URL.to_string(),
            forge_maven: FORGE_MAVEN_URL.to_string(),
            neoforge_maven: NEOFORGE_MAVEN_URL.to_string(),
            paper_api: PAPER_API_URL.to_string(),
            purpur_api: PURPUR_API_URL.to_string(),
            libraries: LIBRARIES_URL.to_string(),
            resources: RESOURCES_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at one host, keeping the upstream path shapes.
    /// Used to run the pipeline against a local mirror or stub server.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            version_manifest: format!("{}/mc/game/version_manifest.json", base),
            fabric_meta: format!("{}/fabric/v2/versions/loader", base),
            fabric_maven: format!("{}/fabric-maven/", base),
            quilt_meta: format!("{}/quilt/v3/versions/loader", base),
            quilt_maven: format!("{}/quilt-maven/", base),
            forge_maven: format!("{}/forge-maven/", base),
            neoforge_maven: format!("{}/neoforge-maven/", base),
            paper_api: format!("{}/paper/v2/projects/paper", base),
            purpur_api: format!("{}/purpur/v2/purpur", base),
            libraries: format!("{}/libraries/", base),
            resources: format!("{}/resources", base),
        }
    }

    /// Every endpoint must be an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("version_manifest", &self.version_manifest),
            ("fabric_meta", &self.fabric_meta),
            ("fabric_maven", &self.fabric_maven),
            ("quilt_meta", &self.quilt_meta),
            ("quilt_maven", &self.quilt_maven),
            ("forge_maven", &self.forge_maven),
            ("neoforge_maven", &self.neoforge_maven),
            ("paper_api", &self.paper_api),
            ("purpur_api", &self.purpur_api),
            ("libraries", &self.libraries),
            ("resources", &self.resources),
        ];
        for (name, raw) in all {
            let parsed = Url::parse(raw).with_context(|| format!("{} is not a URL: {}", name, raw))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("{} must use http or https: {}", name, raw);
            }
        }
        Ok(())
    }
}

fn default_root_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".minecraft"),
        None => {
            log::warn!("Could not find home directory, using ./.minecraft as the data root");
            PathBuf::from(".minecraft")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_pipeline_policy() {
        let config = PipelineConfig::default();
        assert_eq!(config.download_threads, 8);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.sweep_interval(), Duration::from_secs(7200));
        assert_eq!(config.transport.attempts, 3);
        assert_eq!(config.transport.attempt_timeout_secs, 10);
        assert_eq!(config.transport.retry_delay_secs, 3);
        assert_eq!(config.java_path, "auto");
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hopper.json");
        std::fs::write(&path, r#"{ "download_threads": 2, "transport": { "attempts": 5 } }"#)
            .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.download_threads, 2);
        assert_eq!(config.transport.attempts, 5);
        assert_eq!(config.transport.retry_delay_secs, 3);
        assert_eq!(config.max_memory_mb, 2048);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("hopper.json");
        let mut config = PipelineConfig::with_root(dir.path());
        config.endpoints = Endpoints::rooted_at("http://127.0.0.1:9000/");
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.root_dir, dir.path());
        assert_eq!(
            loaded.endpoints.version_manifest,
            "http://127.0.0.1:9000/mc/game/version_manifest.json"
        );
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.download_threads, 8);
    }

    #[test]
    fn bad_endpoint_is_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hopper.json");
        std::fs::write(&path, r#"{ "endpoints": { "paper_api": "ftp://mirror/paper" } }"#).unwrap();
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("paper_api"));

        assert!(Endpoints::default().validate().is_ok());
        assert!(Endpoints::rooted_at("http://127.0.0.1:1234").validate().is_ok());
    }

    #[test]
    fn default_root_is_under_home() {
        let expected = dirs::home_dir().map(|h| h.join(".minecraft"));
        let root = PipelineConfig::default().root_dir;
        match expected {
            Some(path) => assert_eq!(root, path),
            None => assert_eq!(root, PathBuf::from(".minecraft")),
        }
    }
}
