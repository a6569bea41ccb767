//! Acquisition and assembly pipeline for Minecraft builds.
//!
//! A build request ("game version X with loader Y at version Z") is resolved
//! against the remote metadata services, downloaded into a shared data root
//! and recorded on disk. At launch time the stored metadata is turned into a
//! classpath plus JVM and game argument lists.

pub mod build;
pub mod config;
pub mod error;
pub mod game;
pub mod utils;

pub use build::{BuildConfig, BuildOrchestrator, BuildRecord, BuildState, BuildStatus};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use game::installer::types::{
    ChannelSink, LogSink, NullSink, PipelineEvent, ProgressSink,
};
pub use game::metadata::LoaderKind;
