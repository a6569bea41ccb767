pub mod java;
pub mod sanitize;

pub use java::locate_java;
pub use sanitize::sanitize_build_name;
