use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::core::downloader::Transport;
use crate::game::installer::types::DataLayout;
use crate::game::launcher::version_parser::{parse_descriptor, read_descriptor, VersionDescriptor};
use crate::game::metadata::types::{ManifestEntry, VersionManifestIndex};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Locates version metadata in the remote manifest and persists it.
pub struct VersionResolver {
    transport: Arc<Transport>,
    layout: DataLayout,
    manifest_url: String,
}

impl VersionResolver {
    pub fn new(transport: Arc<Transport>, layout: DataLayout, manifest_url: impl Into<String>) -> Self {
        Self {
            transport,
            layout,
            manifest_url: manifest_url.into(),
        }
    }

    /// Resolve `version_id`, reusing the on-disk descriptor when present.
    pub async fn resolve(&self, version_id: &str) -> PipelineResult<VersionDescriptor> {
        let local = self.layout.version_json(version_id);
        if local.exists() {
            log::info!("Version {} already on disk, skipping manifest lookup", version_id);
            return read_descriptor(&local).await;
        }

        let index = self.fetch_index().await?;
        let entry = index
            .versions
            .iter()
            .find(|v| v.id == version_id)
            .ok_or_else(|| {
                PipelineError::NotFound(format!("Version {} is not in the version manifest", version_id))
            })?;

        log::info!("Fetching metadata for {} from {}", version_id, entry.url);
        let bytes = self.transport.fetch_bytes(&entry.url).await?;
        let descriptor = parse_descriptor(&bytes, &entry.url)?;
        self.persist(version_id, &bytes).await?;
        Ok(descriptor)
    }

    /// Every version listed by the remote manifest, newest first as published.
    pub async fn available_versions(&self) -> PipelineResult<Vec<ManifestEntry>> {
        Ok(self.fetch_index().await?.versions)
    }

    pub async fn load_local(&self, version_id: &str) -> PipelineResult<VersionDescriptor> {
        let path = self.layout.version_json(version_id);
        if !path.exists() {
            return Err(PipelineError::NotFound(format!(
                "Version {} is not installed",
                version_id
            )));
        }
        read_descriptor(&path).await
    }

    async fn fetch_index(&self) -> PipelineResult<VersionManifestIndex> {
        log::debug!("Fetching version manifest: {}", self.manifest_url);
        self.transport.fetch_json(&self.manifest_url).await
    }

    /// Write the document exactly as served, replacing any previous copy.
    async fn persist(&self, version_id: &str, bytes: &[u8]) -> PipelineResult<()> {
        let dir = self.layout.version_dir(version_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::fs(&dir, e))?;

        let path = self.layout.version_json(version_id);
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| PipelineError::fs(&dir, e))?;
        tmp.write_all(bytes).map_err(|e| PipelineError::fs(&path, e))?;
        tmp.persist(&path)
            .map_err(|e| PipelineError::fs(&path, e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::error::ErrorKind;
    use reqwest::Client;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer, dir: &TempDir) -> VersionResolver {
        let policy = TransportConfig {
            attempts: 1,
            attempt_timeout_secs: 5,
            retry_delay_secs: 0,
        };
        let transport = Arc::new(Transport::new(Client::new(), None, &policy));
        VersionResolver::new(
            transport,
            DataLayout::new(dir.path()),
            format!("{}/manifest.json", server.uri()),
        )
    }

    async fn mount_manifest(server: &MockServer) {
        let manifest = json!({
            "latest": { "release": "1.20.1", "snapshot": "23w31a" },
            "versions": [
                { "id": "23w31a", "type": "snapshot", "url": format!("{}/v/23w31a.json", server.uri()), "releaseTime": "2023-08-01T00:00:00+00:00" },
                { "id": "1.20.1", "type": "release", "url": format!("{}/v/1.20.1.json", server.uri()), "releaseTime": "2023-06-12T00:00:00+00:00" }
            ]
        });
        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(manifest))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn resolves_and_persists_verbatim() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;
        let raw = r#"{"id":"1.20.1","type":"release","mainClass":"net.minecraft.client.main.Main","libraries":[]}"#;
        Mock::given(method("GET"))
            .and(path("/v/1.20.1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(raw))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let resolver = resolver(&server, &dir);
        let descriptor = resolver.resolve("1.20.1").await.unwrap();
        assert_eq!(descriptor.id, "1.20.1");

        let on_disk = std::fs::read_to_string(dir.path().join("versions/1.20.1/1.20.1.json")).unwrap();
        assert_eq!(on_disk, raw);

        // Second resolve is served from disk.
        let before = server.received_requests().await.unwrap().len();
        resolver.resolve("1.20.1").await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), before);
    }

    #[tokio::test]
    async fn unknown_version_is_not_found() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;
        let dir = TempDir::new().unwrap();

        let err = resolver(&server, &dir).resolve("9.9.9").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn lists_available_versions() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;
        let dir = TempDir::new().unwrap();

        let versions = resolver(&server, &dir).available_versions().await.unwrap();
        let ids: Vec<&str> = versions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["23w31a", "1.20.1"]);
    }

    #[tokio::test]
    async fn concurrent_resolves_share_one_descriptor_file() {
        let server = MockServer::start().await;
        mount_manifest(&server).await;
        let raw = r#"{"id":"1.20.1","type":"release","mainClass":"net.minecraft.client.main.Main","libraries":[]}"#;
        Mock::given(method("GET"))
            .and(path("/v/1.20.1.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(raw)
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let resolver = resolver(&server, &dir);
        let (a, b) = tokio::join!(resolver.resolve("1.20.1"), resolver.resolve("1.20.1"));
        assert_eq!(a.unwrap().id, "1.20.1");
        assert_eq!(b.unwrap().id, "1.20.1");

        let version_dir = dir.path().join("versions/1.20.1");
        let names: Vec<String> = std::fs::read_dir(&version_dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1.20.1.json".to_string()]);
    }
}
