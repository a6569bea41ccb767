use crate::config::{PipelineConfig, TransportConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::game::cache::Cache;
use crate::game::installer::types::{DataLayout, ProgressSink};
use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::{Builder, NamedTempFile};
use tokio::fs::{create_dir_all, File};
use tokio::io::AsyncWriteExt;

/// Single-fetch primitive: cache-first lookup, then a fixed number of
/// attempts, each bounded by a timeout, with a fixed delay in between.
pub struct Transport {
    client: Client,
    cache: Option<Arc<Cache>>,
    attempts: u32,
    attempt_timeout: Duration,
    retry_delay: Duration,
}

impl Transport {
    pub fn new(client: Client, cache: Option<Arc<Cache>>, policy: &TransportConfig) -> Self {
        Self {
            client,
            cache,
            attempts: policy.attempts.max(1),
            attempt_timeout: Duration::from_secs(policy.attempt_timeout_secs),
            retry_delay: Duration::from_secs(policy.retry_delay_secs),
        }
    }

    /// Build the client and, when enabled, the shared cache under the data root.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("hopper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let cache = config.use_cache.then(|| {
            let layout = DataLayout::new(&config.root_dir);
            Arc::new(Cache::new(layout.cache_dir(), config.cache_ttl()))
        });

        Ok(Self::new(client, cache, &config.transport))
    }

    pub fn cache(&self) -> Option<&Arc<Cache>> {
        self.cache.as_ref()
    }

    /// Download `url` to `dest`.
    ///
    /// Every attempt streams into its own temporary file next to `dest` and
    /// renames it into place, so concurrent fetches of one destination never
    /// see each other's partial writes. A failed call removes only its own
    /// temporary file. Progress is reported as `(percent, 100, message)`
    /// with `-1` on final failure.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected_sha1: Option<&str>,
        progress: Option<&dyn ProgressSink>,
    ) -> PipelineResult<()> {
        log::debug!("Downloading: {} -> {:?}", url, dest);

        if dest.exists() {
            match expected_sha1 {
                Some(expected) => {
                    if file_sha1(dest).await.is_some_and(|h| h.eq_ignore_ascii_case(expected)) {
                        log::debug!("File exists and hash matches, skipping: {:?}", dest);
                        report(progress, 100, "Already present");
                        return Ok(());
                    }
                    log::info!("File exists but hash mismatches, re-downloading: {:?}", dest);
                    remove_quietly(dest);
                }
                None => {
                    log::debug!("File exists and no hash provided, assuming valid: {:?}", dest);
                    report(progress, 100, "Already present");
                    return Ok(());
                }
            }
        }

        if let Some(parent) = dest.parent() {
            create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::fs(parent, e))?;
        }

        if self.restore_from_cache(url, dest, expected_sha1).await? {
            report(progress, 100, "From cache");
            return Ok(());
        }

        let result = self
            .with_retries(url, move || self.download_once(url, dest, expected_sha1, progress))
            .await;

        match result {
            Ok(bytes) => {
                if let (Some(cache), Some(bytes)) = (&self.cache, bytes) {
                    if let Err(e) = cache.set(url, &bytes) {
                        log::warn!("Failed to cache {}: {}", url, e);
                    }
                }
                report(progress, 100, "Done");
                Ok(())
            }
            Err(e) => {
                log::error!("Download failed for {}: {}", url, e);
                report(progress, -1, &e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch a small document into memory with the same retry policy.
    pub async fn fetch_bytes(&self, url: &str) -> PipelineResult<Vec<u8>> {
        self.with_retries(
            url,
            move || async move {
                let response = self.send(url).await?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| PipelineError::network(url, e))?;
                Ok(bytes.to_vec())
            },
        )
        .await
    }

    /// Fetch and parse a JSON document. Parse failures are reported as
    /// malformed metadata and are not retried.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> PipelineResult<T> {
        let bytes = self.fetch_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| PipelineError::malformed(url, e))
    }

    async fn restore_from_cache(
        &self,
        url: &str,
        dest: &Path,
        expected_sha1: Option<&str>,
    ) -> PipelineResult<bool> {
        let Some(cache) = &self.cache else {
            return Ok(false);
        };
        let Some(bytes) = cache.get(url, None) else {
            return Ok(false);
        };
        if let Some(expected) = expected_sha1 {
            if !sha1_hex(&bytes).eq_ignore_ascii_case(expected) {
                log::warn!("Cached bytes for {} fail hash check, ignoring cache", url);
                return Ok(false);
            }
        }

        let mut tmp = temp_beside(dest)?;
        std::io::Write::write_all(&mut tmp, &bytes).map_err(|e| PipelineError::fs(tmp.path(), e))?;
        tmp.persist(dest)
            .map_err(|e| PipelineError::fs(dest, e.error))?;
        log::debug!("Restored {} from cache", url);
        Ok(true)
    }

    async fn with_retries<T, F, Fut>(&self, url: &str, mut op: F) -> PipelineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PipelineResult<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(PipelineError::network(
                    url,
                    format!("timed out after {}s", self.attempt_timeout.as_secs()),
                )),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= self.attempts {
                return Err(err);
            }
            log::warn!(
                "Attempt {}/{} failed for {}: {}. Retrying in {}s...",
                attempt,
                self.attempts,
                url,
                err,
                self.retry_delay.as_secs()
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    async fn send(&self, url: &str) -> PipelineResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::network(url, e))?;
        if !response.status().is_success() {
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    /// One attempt. Returns the body when it should be cached.
    ///
    /// The temporary file is deleted when this future fails or is dropped.
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        expected_sha1: Option<&str>,
        progress: Option<&dyn ProgressSink>,
    ) -> PipelineResult<Option<Vec<u8>>> {
        let start = Instant::now();
        let response = self.send(url).await?;
        let total_size = response.content_length().filter(|n| *n > 0);

        let (std_file, part) = temp_beside(dest)?.into_parts();
        let mut file = File::from_std(std_file);
        let mut hasher = Sha1::new();
        let mut kept = self.cache.as_ref().map(|_| Vec::new());
        let mut downloaded: u64 = 0;
        let mut last_percent = -1;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PipelineError::network(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::fs(part.to_path_buf(), e))?;
            hasher.update(&chunk);
            if let Some(buf) = kept.as_mut() {
                buf.extend_from_slice(&chunk);
            }

            downloaded += chunk.len() as u64;
            if let Some(total) = total_size {
                let percent = ((downloaded.min(total) * 100) / total) as i64;
                if percent != last_percent && percent < 100 {
                    last_percent = percent;
                    report(progress, percent, &format!("Downloading {}%", percent));
                }
            }
        }
        file.flush().await.map_err(|e| PipelineError::fs(part.to_path_buf(), e))?;
        drop(file);

        if let Some(expected) = expected_sha1 {
            let computed = format!("{:x}", hasher.finalize());
            if !computed.eq_ignore_ascii_case(expected) {
                return Err(PipelineError::network(
                    url,
                    format!("SHA1 mismatch: expected {}, got {}", expected, computed),
                ));
            }
        }

        part.persist(dest)
            .map_err(|e| PipelineError::fs(dest, e.error))?;

        log::debug!(
            "Downloaded {} ({} bytes) in {:.2}s",
            url,
            downloaded,
            start.elapsed().as_secs_f64()
        );
        Ok(kept)
    }
}

fn report(progress: Option<&dyn ProgressSink>, percent: i64, message: &str) {
    if let Some(sink) = progress {
        sink.progress(percent, 100, message);
    }
}

/// Uniquely named `<name>.<random>.part` file in the directory of `dest`.
fn temp_beside(dest: &Path) -> PipelineResult<NamedTempFile> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    Builder::new()
        .prefix(&format!("{}.", name))
        .suffix(".part")
        .tempfile_in(parent)
        .map_err(|e| PipelineError::fs(parent, e))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

pub(crate) fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

async fn file_sha1(path: &Path) -> Option<String> {
    tokio::fs::read(path).await.ok().map(|bytes| sha1_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(i64, String)>>);

    impl ProgressSink for Recorder {
        fn progress(&self, current: i64, _total: i64, message: &str) {
            self.0.lock().unwrap().push((current, message.to_string()));
        }
    }

    fn leftover_parts(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count()
    }

    fn transport(cache: Option<Arc<Cache>>) -> Transport {
        let policy = TransportConfig {
            attempts: 3,
            attempt_timeout_secs: 10,
            retry_delay_secs: 0,
        };
        Transport::new(Client::new(), cache, &policy)
    }

    #[tokio::test]
    async fn cache_hit_skips_network() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(Cache::new(dir.path().join("cache"), Duration::from_secs(3600)));
        let url = format!("{}/blob.bin", server.uri());
        cache.set(&url, b"cached bytes").unwrap();

        let recorder = Recorder::default();
        let dest = dir.path().join("out/blob.bin");
        transport(Some(cache))
            .fetch(&url, &dest, None, Some(&recorder))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"cached bytes");
        assert!(server.received_requests().await.unwrap().is_empty());
        assert_eq!(*recorder.0.lock().unwrap(), vec![(100, "From cache".to_string())]);
    }

    #[tokio::test]
    async fn successful_download_fills_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lib.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let cache = Arc::new(Cache::new(dir.path().join("cache"), Duration::from_secs(3600)));
        let url = format!("{}/lib.jar", server.uri());
        let dest = dir.path().join("lib.jar");
        let sha = sha1_hex(b"jar-bytes");

        let t = transport(Some(cache.clone()));
        t.fetch(&url, &dest, Some(&sha), None).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"jar-bytes");
        assert_eq!(cache.get(&url, None).as_deref(), Some(&b"jar-bytes"[..]));
        assert_eq!(leftover_parts(dir.path()), 0);

        // Present with a matching hash: no second request.
        t.fetch(&url, &dest, Some(&sha), None).await.unwrap();
    }

    #[tokio::test]
    async fn hash_mismatch_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bad.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"corrupt".to_vec()))
            .expect(3)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("bad.jar");
        let recorder = Recorder::default();
        let err = transport(None)
            .fetch(
                &format!("{}/bad.jar", server.uri()),
                &dest,
                Some("0000000000000000000000000000000000000000"),
                Some(&recorder),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("SHA1 mismatch"));
        assert!(!dest.exists());
        assert_eq!(leftover_parts(dir.path()), 0);
        assert_eq!(recorder.0.lock().unwrap().last().unwrap().0, -1);
    }

    #[tokio::test]
    async fn fetch_json_reports_malformed_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
            .expect(1)
            .mount(&server)
            .await;

        let err = transport(None)
            .fetch_json::<serde_json::Value>(&format!("{}/doc.json", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn concurrent_fetches_of_one_destination_both_succeed() {
        let body = vec![7u8; 4 * 1024 * 1024];
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shared.jar"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.clone())
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("shared.jar");
        let url = format!("{}/shared.jar", server.uri());
        let t = transport(None);

        for _ in 0..5 {
            let (a, b) = tokio::join!(
                t.fetch(&url, &dest, None, None),
                t.fetch(&url, &dest, None, None)
            );
            a.unwrap();
            b.unwrap();
            assert_eq!(std::fs::read(&dest).unwrap().len(), body.len());
            assert_eq!(leftover_parts(dir.path()), 0);
            std::fs::remove_file(&dest).unwrap();
        }
    }
}
