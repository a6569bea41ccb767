use crate::game::installer::core::downloader::Transport;
use crate::game::installer::types::{LogSink, ProgressSink};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FetchItem {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    /// Short display name used in progress and log messages.
    pub label: String,
}

impl FetchItem {
    pub fn new(url: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        let url = url.into();
        let label = url.rsplit('/').next().unwrap_or(&url).to_string();
        Self {
            url,
            dest: dest.into(),
            sha1: None,
            label,
        }
    }

    pub fn with_sha1(mut self, sha1: Option<String>) -> Self {
        self.sha1 = sha1;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub url: String,
    pub dest: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<FetchFailure>,
}

impl FetchReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failure_summary(&self) -> String {
        let names: Vec<&str> = self.failed.iter().map(|f| f.url.as_str()).collect();
        format!("{} of {} downloads failed: {}", self.failed.len(), self.total, names.join(", "))
    }
}

/// Fans fetches out over a bounded pool of concurrent transfers.
pub struct FetchEngine {
    transport: Arc<Transport>,
    concurrency: usize,
}

impl FetchEngine {
    pub fn new(transport: Arc<Transport>, concurrency: usize) -> Self {
        Self {
            transport,
            concurrency: concurrency.max(1),
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Fetch every item and wait for all of them, successful or not.
    ///
    /// `progress` is called once per input item with a non-decreasing count.
    /// Items sharing a destination are downloaded once; the copies complete
    /// together with the original.
    pub async fn fetch_all(
        &self,
        items: Vec<FetchItem>,
        progress: &dyn ProgressSink,
        log: &dyn LogSink,
    ) -> FetchReport {
        let total = items.len();
        let mut report = FetchReport {
            total,
            ..FetchReport::default()
        };
        if total == 0 {
            return report;
        }

        let mut unique: Vec<(FetchItem, usize)> = Vec::new();
        let mut index_by_dest: HashMap<PathBuf, usize> = HashMap::new();
        for item in items {
            match index_by_dest.get(&item.dest) {
                Some(&i) => unique[i].1 += 1,
                None => {
                    index_by_dest.insert(item.dest.clone(), unique.len());
                    unique.push((item, 1));
                }
            }
        }

        log::info!(
            "Fetching {} files ({} unique) with {} workers",
            total,
            unique.len(),
            self.concurrency
        );

        let transport = &self.transport;
        let mut results = stream::iter(unique)
            .map(|(item, copies)| async move {
                let result = transport
                    .fetch(&item.url, &item.dest, item.sha1.as_deref(), None)
                    .await;
                (item, copies, result)
            })
            .buffer_unordered(self.concurrency);

        let mut done = 0usize;
        while let Some((item, copies, result)) = results.next().await {
            match result {
                Ok(()) => {
                    report.succeeded += copies;
                    log::debug!("Fetched {}", item.label);
                }
                Err(e) => {
                    log.log(&format!("Failed to download {}: {}", item.label, e));
                    report.failed.push(FetchFailure {
                        url: item.url.clone(),
                        dest: item.dest.clone(),
                        error: e.to_string(),
                    });
                }
            }
            for _ in 0..copies {
                done += 1;
                progress.progress(
                    done as i64,
                    total as i64,
                    &format!("Downloaded {} ({}/{})", item.label, done, total),
                );
            }
        }

        if report.all_succeeded() {
            log::info!("Fetched all {} files", total);
        } else {
            log::warn!("{}", report.failure_summary());
        }
        report
    }
}
