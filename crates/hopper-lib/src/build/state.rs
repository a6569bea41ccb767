use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Unknown,
    Downloading,
    Installing,
    Ready,
    Error,
}

impl BuildStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, BuildStatus::Downloading | BuildStatus::Installing)
    }

    /// Transitions reachable without a fresh `create_build` call.
    fn can_advance_to(&self, next: BuildStatus) -> bool {
        use BuildStatus::*;
        matches!(
            (self, next),
            (Downloading, Downloading | Installing | Ready | Error)
                | (Installing, Installing | Ready | Error)
        )
    }
}

/// Transient per-build state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildState {
    pub status: BuildStatus,
    /// 0-100, or -1 once the build failed.
    pub progress: i32,
    pub message: String,
}

impl BuildState {
    pub fn new(status: BuildStatus, progress: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            progress,
            message: message.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(BuildStatus::Unknown, 0, "")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(BuildStatus::Error, -1, message)
    }
}

/// In-memory state table. One lock, held only for a single read or write.
#[derive(Default)]
pub struct BuildStateStore {
    states: Mutex<HashMap<String, BuildState>>,
}

impl BuildStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, BuildState>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> BuildState {
        self.lock().get(key).cloned().unwrap_or_else(BuildState::unknown)
    }

    /// Claim `key` for a new run. Fails while another run is active.
    pub fn try_begin(&self, key: &str, message: &str) -> bool {
        let mut states = self.lock();
        if states.get(key).is_some_and(|s| s.status.is_active()) {
            return false;
        }
        states.insert(
            key.to_string(),
            BuildState::new(BuildStatus::Downloading, 0, message),
        );
        true
    }

    /// Apply `next` if the current status allows it. Returns whether it was applied.
    pub fn advance(&self, key: &str, next: BuildState) -> bool {
        let mut states = self.lock();
        let current = states
            .get(key)
            .map(|s| s.status)
            .unwrap_or(BuildStatus::Unknown);
        if !current.can_advance_to(next.status) {
            log::warn!(
                "Ignoring build state change for {}: {:?} -> {:?}",
                key,
                current,
                next.status
            );
            return false;
        }
        states.insert(key.to_string(), next);
        true
    }

    /// Update progress of an active build without changing its status.
    pub fn set_progress(&self, key: &str, progress: i32, message: &str) -> bool {
        let mut states = self.lock();
        match states.get_mut(key) {
            Some(state) if state.status.is_active() => {
                state.progress = progress;
                state.message = message.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn clear(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn snapshot(&self) -> Vec<(String, BuildState)> {
        let mut all: Vec<_> = self
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
