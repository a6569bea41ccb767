pub mod resolver;
pub mod types;

pub use resolver::VersionResolver;
pub use types::*;
