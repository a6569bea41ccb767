/// Classpath construction for the launcher
use crate::game::installer::types::{Arch, DataLayout, OsType};
use crate::game::launcher::rules::is_library_needed;
use crate::game::launcher::version_parser::VersionDescriptor;
use std::collections::HashSet;
use std::path::PathBuf;

/// Validation errors that occur during launch preparation
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Required library not found: {}", library_path.display())]
    LibraryNotFound { library_path: PathBuf },
}

/// Ordered classpath entries: every needed library, then the client jar.
/// Duplicate paths keep their first position.
pub fn build_classpath(
    descriptor: &VersionDescriptor,
    layout: &DataLayout,
    default_repo: &str,
    os: OsType,
    arch: Arch,
) -> Vec<PathBuf> {
    let libraries_dir = layout.libraries_dir();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for library in &descriptor.libraries {
        if !is_library_needed(library, os, arch) {
            log::debug!("Excluding library by rule: {}", library.name);
            continue;
        }
        let Some(location) = library.location(default_repo) else {
            log::warn!("Skipping library with invalid Maven coordinates: {}", library.name);
            continue;
        };
        let path = libraries_dir.join(&location.path);
        if seen.insert(path.clone()) {
            entries.push(path);
        }
    }

    entries.push(layout.version_jar(descriptor.client_jar_id()));
    entries
}

/// Join entries with the platform separator.
pub fn join_classpath(entries: &[PathBuf], os: OsType) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(os.classpath_separator())
}

/// Check that every entry exists on disk.
pub fn validate_classpath(entries: &[PathBuf]) -> Result<(), Vec<ValidationError>> {
    let missing: Vec<ValidationError> = entries
        .iter()
        .filter(|p| !p.exists())
        .map(|p| ValidationError::LibraryNotFound {
            library_path: p.clone(),
        })
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
