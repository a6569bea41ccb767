//! Version metadata documents and their `inheritsFrom` resolution.

use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::types::DataLayout;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Per-version metadata document (`versions/<id>/<id>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionDescriptor {
    /// Version ID (e.g., "1.20.1" or "fabric-loader-0.14.21-1.20.1")
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub version_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,

    /// Parent version for loader profiles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,

    /// Legacy arguments (pre-1.13)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,

    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexRef>,

    /// Assets version (legacy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<VersionDownloads>,

    /// Version whose client jar this descriptor launches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
}

impl VersionDescriptor {
    pub fn client_jar_id(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,

    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// Argument that can be simple or conditional
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Simple(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ArgumentValue {
    pub fn values(&self) -> Vec<String> {
        match self {
            ArgumentValue::Single(s) => vec![s.clone()],
            ArgumentValue::Multiple(v) => v.clone(),
        }
    }
}

/// Platform rule on a library or argument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub action: RuleAction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    /// Maven coordinates
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,

    /// Maven repository base for entries without `downloads` (loader profiles)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<DownloadRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<DownloadRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRef {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Asset index document: logical name -> content hash.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexDocument {
    #[serde(default)]
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

/// Where a library artifact lives, relative to the libraries directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocation {
    pub url: String,
    pub path: String,
    pub sha1: Option<String>,
}

impl LibraryEntry {
    /// Resolve the download location. Entries without `downloads.artifact`
    /// derive the path from the coordinate and the URL from `url` or
    /// `default_repo`. Returns `None` for unparseable coordinates.
    pub fn location(&self, default_repo: &str) -> Option<ArtifactLocation> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            let path = match &artifact.path {
                Some(p) => p.clone(),
                None => maven_to_path(&self.name)?,
            };
            let url = match &artifact.url {
                Some(u) if !u.is_empty() => u.clone(),
                _ => join_repo(self.url.as_deref().unwrap_or(default_repo), &path),
            };
            return Some(ArtifactLocation {
                url,
                path,
                sha1: artifact.sha1.clone(),
            });
        }

        let path = maven_to_path(&self.name)?;
        let url = join_repo(self.url.as_deref().unwrap_or(default_repo), &path);
        Some(ArtifactLocation {
            url,
            path,
            sha1: self.sha1.clone(),
        })
    }
}

fn join_repo(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Convert Maven coordinates to a relative path.
/// Format: group:artifact:version[:classifier][@extension]
/// Example: "com.google.guava:guava:21.0" -> "com/google/guava/guava/21.0/guava-21.0.jar"
pub fn maven_to_path(coords: &str) -> Option<String> {
    let (coords, extension) = match coords.split_once('@') {
        Some((c, ext)) => (c, ext),
        None => (coords, "jar"),
    };
    let parts: Vec<&str> = coords.split(':').collect();
    if parts.len() < 3 || parts[..3].iter().any(|p| p.is_empty()) {
        return None;
    }

    let group = parts[0].replace('.', "/");
    let artifact = parts[1];
    let version = parts[2];
    let filename = match parts.get(3) {
        Some(classifier) => format!("{}-{}-{}.{}", artifact, version, classifier, extension),
        None => format!("{}-{}.{}", artifact, version, extension),
    };

    Some(format!("{}/{}/{}/{}", group, artifact, version, filename))
}

/// Parse a descriptor from raw bytes.
pub fn parse_descriptor(bytes: &[u8], origin: &str) -> PipelineResult<VersionDescriptor> {
    serde_json::from_slice(bytes).map_err(|e| PipelineError::malformed(origin, e))
}

/// Read a persisted descriptor from disk.
pub async fn read_descriptor(path: &Path) -> PipelineResult<VersionDescriptor> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::fs(path, e))?;
    parse_descriptor(&bytes, &path.display().to_string())
}

/// Load `version_id` and merge every `inheritsFrom` ancestor into it.
pub async fn resolve_version_chain(
    layout: &DataLayout,
    version_id: &str,
) -> PipelineResult<VersionDescriptor> {
    let mut chain = Vec::new();
    let mut next = Some(version_id.to_string());

    while let Some(id) = next {
        if chain.iter().any(|d: &VersionDescriptor| d.id == id) {
            return Err(PipelineError::malformed(
                format!("version {}", version_id),
                format!("inheritance cycle at {}", id),
            ));
        }
        let path = layout.version_json(&id);
        if !path.exists() {
            return Err(PipelineError::NotFound(format!(
                "Version {} is not installed ({:?})",
                id, path
            )));
        }
        let descriptor = read_descriptor(&path).await?;
        next = descriptor.inherits_from.clone();
        chain.push(descriptor);
    }

    // chain is child-first; fold from the root ancestor down.
    let mut merged = match chain.pop() {
        Some(root) => root,
        None => return Err(PipelineError::NotFound(version_id.to_string())),
    };
    while let Some(child) = chain.pop() {
        merged = merge_descriptors(merged, child);
    }
    Ok(merged)
}

/// Merge a child descriptor (loader profile) onto its parent.
pub fn merge_descriptors(mut parent: VersionDescriptor, child: VersionDescriptor) -> VersionDescriptor {
    parent.jar = Some(child.jar.unwrap_or_else(|| parent.client_jar_id().to_string()));
    parent.id = child.id;
    if child.main_class.is_some() {
        parent.main_class = child.main_class;
    }

    if let Some(child_args) = child.arguments {
        let parent_args = parent.arguments.get_or_insert_with(Arguments::default);
        parent_args.game.extend(child_args.game);
        parent_args.jvm.extend(child_args.jvm);
    }

    // Legacy argument strings are complete command lines, so the child's replaces the parent's
    if child.minecraft_arguments.is_some() {
        parent.minecraft_arguments = child.minecraft_arguments;
    }

    // Child libraries come after parent
    parent.libraries.extend(child.libraries);

    if child.asset_index.is_some() {
        parent.asset_index = child.asset_index;
    }
    if child.assets.is_some() {
        parent.assets = child.assets;
    }
    if child.version_type.is_some() {
        parent.version_type = child.version_type;
    }
    if child.downloads.is_some() {
        parent.downloads = child.downloads;
    }

    parent.inherits_from = None;
    parent
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn maven_paths() {
        assert_eq!(
            maven_to_path("com.google.guava:guava:21.0").as_deref(),
            Some("com/google/guava/guava/21.0/guava-21.0.jar")
        );
        assert_eq!(
            maven_to_path("org.lwjgl:lwjgl:3.3.1:natives-linux").as_deref(),
            Some("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar")
        );
        assert_eq!(
            maven_to_path("de.oceanlabs.mcp:mcp_config:1.20.1@zip").as_deref(),
            Some("de/oceanlabs/mcp/mcp_config/1.20.1/mcp_config-1.20.1.zip")
        );
        assert_eq!(maven_to_path("broken:coords"), None);
    }

    #[test]
    fn profile_library_resolves_against_its_repo() {
        let lib: LibraryEntry = serde_json::from_str(
            r#"{ "name": "net.fabricmc:fabric-loader:0.14.21", "url": "https://maven.fabricmc.net/" }"#,
        )
        .unwrap();
        let loc = lib.location("https://libraries.minecraft.net/").unwrap();
        assert_eq!(
            loc.url,
            "https://maven.fabricmc.net/net/fabricmc/fabric-loader/0.14.21/fabric-loader-0.14.21.jar"
        );
        assert_eq!(loc.path, "net/fabricmc/fabric-loader/0.14.21/fabric-loader-0.14.21.jar");
    }

    #[test]
    fn parses_conditional_arguments() {
        let json = r#"{
            "id": "1.20.1",
            "type": "release",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {
                "game": ["--username", "${auth_player_name}",
                    { "rules": [{ "action": "allow", "features": { "is_demo_user": true } }], "value": "--demo" }],
                "jvm": [{ "rules": [{ "action": "allow", "os": { "name": "osx" } }], "value": ["-XstartOnFirstThread"] }]
            },
            "libraries": []
        }"#;
        let d = parse_descriptor(json.as_bytes(), "test").unwrap();
        let args = d.arguments.unwrap();
        assert_eq!(args.game.len(), 3);
        assert!(matches!(args.jvm[0], Argument::Conditional { .. }));
    }

    #[test]
    fn missing_id_is_malformed() {
        let err = parse_descriptor(br#"{ "mainClass": "x" }"#, "broken.json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn chain_merges_profile_onto_parent() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        let write = |id: &str, body: &str| {
            let path = layout.version_json(id);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        };
        write(
            "1.20.1",
            r#"{ "id": "1.20.1", "type": "release", "mainClass": "net.minecraft.client.main.Main",
                 "assetIndex": { "id": "5", "url": "http://x/5.json" },
                 "arguments": { "game": ["--version", "${version_name}"], "jvm": ["-cp", "${classpath}"] },
                 "libraries": [{ "name": "a:b:1" }] }"#,
        );
        write(
            "fabric-loader-0.14.21-1.20.1",
            r#"{ "id": "fabric-loader-0.14.21-1.20.1", "inheritsFrom": "1.20.1",
                 "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                 "arguments": { "game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "] },
                 "libraries": [{ "name": "net.fabricmc:fabric-loader:0.14.21", "url": "https://maven.fabricmc.net/" }] }"#,
        );

        let merged = resolve_version_chain(&layout, "fabric-loader-0.14.21-1.20.1")
            .await
            .unwrap();
        assert_eq!(merged.id, "fabric-loader-0.14.21-1.20.1");
        assert_eq!(merged.client_jar_id(), "1.20.1");
        assert_eq!(
            merged.main_class.as_deref(),
            Some("net.fabricmc.loader.impl.launch.knot.KnotClient")
        );
        assert_eq!(merged.libraries.len(), 2);
        assert_eq!(merged.libraries[0].name, "a:b:1");
        assert_eq!(merged.asset_index.unwrap().id, "5");
        assert_eq!(merged.arguments.unwrap().jvm.len(), 3);
        assert!(merged.inherits_from.is_none());
    }
}
