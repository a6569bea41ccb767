use serde::{Deserialize, Serialize};

/// Loader family requested for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderKind {
    #[serde(alias = "Vanilla")]
    Vanilla,
    #[serde(alias = "Fabric")]
    Fabric,
    #[serde(alias = "Quilt")]
    Quilt,
    #[serde(alias = "Forge")]
    Forge,
    #[serde(alias = "NeoForge")]
    NeoForge,
    #[serde(alias = "Paper")]
    Paper,
    #[serde(alias = "Purpur")]
    Purpur,
}

impl LoaderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderKind::Vanilla => "vanilla",
            LoaderKind::Fabric => "fabric",
            LoaderKind::Quilt => "quilt",
            LoaderKind::Forge => "forge",
            LoaderKind::NeoForge => "neoforge",
            LoaderKind::Paper => "paper",
            LoaderKind::Purpur => "purpur",
        }
    }

    /// Server distributions have no client and no mod support.
    pub fn is_server_only(&self) -> bool {
        matches!(self, LoaderKind::Paper | LoaderKind::Purpur)
    }
}

impl std::fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoaderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vanilla" => Ok(LoaderKind::Vanilla),
            "fabric" => Ok(LoaderKind::Fabric),
            "quilt" => Ok(LoaderKind::Quilt),
            "forge" => Ok(LoaderKind::Forge),
            "neoforge" => Ok(LoaderKind::NeoForge),
            "paper" => Ok(LoaderKind::Paper),
            "purpur" => Ok(LoaderKind::Purpur),
            _ => Err(anyhow::anyhow!("Unknown loader: {}", s)),
        }
    }
}

/// Remote index of every known game version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManifestIndex {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<LatestVersions>,
    pub versions: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_names_parse_in_any_case() {
        assert_eq!("Fabric".parse::<LoaderKind>().unwrap(), LoaderKind::Fabric);
        assert_eq!("NEOFORGE".parse::<LoaderKind>().unwrap(), LoaderKind::NeoForge);
        assert!("rift".parse::<LoaderKind>().is_err());

        let from_json: LoaderKind = serde_json::from_str("\"Vanilla\"").unwrap();
        assert_eq!(from_json, LoaderKind::Vanilla);
        assert_eq!(serde_json::to_string(&LoaderKind::Purpur).unwrap(), "\"purpur\"");
    }

    #[test]
    fn server_only_loaders() {
        assert!(LoaderKind::Paper.is_server_only());
        assert!(LoaderKind::Purpur.is_server_only());
        assert!(!LoaderKind::Fabric.is_server_only());
    }
}
