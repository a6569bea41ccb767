//! Default remote endpoints and transport policy.
//! Overridable through [`crate::config::PipelineConfig`].

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 3;

// URL Constants
pub const VANILLA_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const LIBRARIES_URL: &str = "https://libraries.minecraft.net/";
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const FABRIC_META_URL: &str = "https://meta.fabricmc.net/v2/versions/loader";
pub const FABRIC_MAVEN_URL: &str = "https://maven.fabricmc.net/";
pub const QUILT_META_URL: &str = "https://meta.quiltmc.org/v3/versions/loader";
pub const QUILT_MAVEN_URL: &str = "https://maven.quiltmc.org/repository/release/";
pub const NEOFORGE_MAVEN_URL: &str = "https://maven.neoforged.net/releases/";
pub const FORGE_MAVEN_URL: &str = "https://maven.minecraftforge.net/";
pub const PAPER_API_URL: &str = "https://api.papermc.io/v2/projects/paper";
pub const PURPUR_API_URL: &str = "https://api.purpurmc.org/v2/purpur";
