pub mod cache;
pub mod installer;
pub mod launcher;
pub mod metadata;

pub use installer::types::{Arch, DataLayout, OsType};
pub use launcher::{LaunchRequest, ResolvedInstance};
pub use metadata::{LoaderKind, VersionResolver};
