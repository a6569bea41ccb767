//! Build lifecycle: state table, persisted records and the orchestrator
//! that drives a build from `unknown` to `ready`.

pub mod orchestrator;
pub mod record;
pub mod state;

pub use orchestrator::BuildOrchestrator;
pub use record::{BuildConfig, BuildRecord};
pub use state::{BuildState, BuildStateStore, BuildStatus};
