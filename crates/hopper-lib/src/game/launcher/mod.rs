//! Launch-time assembly: descriptor + library tree -> argv.

pub mod arguments;
pub mod classpath;
pub mod process;
pub mod rules;
pub mod version_parser;

use crate::error::{PipelineError, PipelineResult};
use crate::game::installer::types::{Arch, DataLayout, OsType};
use arguments::{expand_arguments, filter_game_arguments, split_preserving_quotes};
use classpath::{build_classpath, join_classpath};
use dunce::canonicalize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use version_parser::VersionDescriptor;

pub use process::launch;
pub use version_parser::resolve_version_chain;

const LAUNCHER_NAME: &str = "hopper";
const DEFAULT_RESOLUTION: (u32, u32) = (854, 480);

/// What the caller asks for at launch time.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub player_name: String,
    pub game_dir: PathBuf,
    pub resolution: Option<(u32, u32)>,
    /// `0` leaves the JVM default.
    pub max_memory_mb: u32,
    pub min_memory_mb: u32,
}

impl LaunchRequest {
    pub fn new(player_name: impl Into<String>, game_dir: impl Into<PathBuf>) -> Self {
        Self {
            player_name: player_name.into(),
            game_dir: game_dir.into(),
            resolution: None,
            max_memory_mb: 0,
            min_memory_mb: 0,
        }
    }
}

/// Fully assembled launch command. Derived fresh for every launch.
#[derive(Debug, Clone)]
pub struct ResolvedInstance {
    pub classpath: Vec<PathBuf>,
    pub main_class: String,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
}

impl ResolvedInstance {
    /// The argv array: java, JVM arguments, main class, game arguments.
    pub fn command(&self, java: &Path) -> Vec<String> {
        let mut argv = Vec::with_capacity(2 + self.jvm_args.len() + self.game_args.len());
        argv.push(java.to_string_lossy().to_string());
        argv.extend(self.jvm_args.iter().cloned());
        argv.push(self.main_class.clone());
        argv.extend(self.game_args.iter().cloned());
        argv
    }
}

/// Deterministic offline UUID for a player name.
pub fn offline_uuid(player_name: &str) -> String {
    Uuid::new_v3(&Uuid::NAMESPACE_DNS, player_name.as_bytes()).to_string()
}

pub struct LaunchAssembler {
    layout: DataLayout,
    libraries_repo: String,
    os: OsType,
    arch: Arch,
}

impl LaunchAssembler {
    pub fn new(layout: DataLayout, libraries_repo: impl Into<String>) -> Self {
        Self::for_platform(layout, libraries_repo, OsType::current(), Arch::current())
    }

    pub fn for_platform(
        layout: DataLayout,
        libraries_repo: impl Into<String>,
        os: OsType,
        arch: Arch,
    ) -> Self {
        Self {
            layout,
            libraries_repo: libraries_repo.into(),
            os,
            arch,
        }
    }

    pub fn assemble(
        &self,
        descriptor: &VersionDescriptor,
        request: &LaunchRequest,
    ) -> PipelineResult<ResolvedInstance> {
        let main_class = descriptor
            .main_class
            .clone()
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                PipelineError::malformed(
                    format!("version {}", descriptor.id),
                    "no main class specified",
                )
            })?;

        let classpath = build_classpath(
            descriptor,
            &self.layout,
            &self.libraries_repo,
            self.os,
            self.arch,
        );
        let variables = self.variables(descriptor, request, &classpath);

        let mut jvm_args = Vec::new();
        if request.max_memory_mb > 0 {
            jvm_args.push(format!("-Xmx{}M", request.max_memory_mb));
        }
        if request.min_memory_mb > 0 {
            jvm_args.push(format!("-Xms{}M", request.min_memory_mb));
        }

        let mut game_args = Vec::new();
        if let Some(legacy) = &descriptor.minecraft_arguments {
            game_args.extend(
                split_preserving_quotes(legacy)
                    .iter()
                    .map(|t| arguments::substitute_variables(t, &variables)),
            );
        }

        match &descriptor.arguments {
            Some(template) => {
                jvm_args.extend(expand_arguments(&template.jvm, &variables, self.os, self.arch));
                game_args.extend(expand_arguments(&template.game, &variables, self.os, self.arch));
            }
            None => {
                let var = |k: &str| variables.get(k).cloned().unwrap_or_default();
                jvm_args.push(format!("-Djava.library.path={}", var("natives_directory")));
                jvm_args.push("-cp".to_string());
                jvm_args.push(var("classpath"));
            }
        }

        Ok(ResolvedInstance {
            classpath,
            main_class,
            jvm_args: jvm_args.into_iter().filter(|a| !a.trim().is_empty()).collect(),
            game_args: filter_game_arguments(game_args),
        })
    }

    fn variables(
        &self,
        descriptor: &VersionDescriptor,
        request: &LaunchRequest,
        classpath: &[PathBuf],
    ) -> HashMap<String, String> {
        let (width, height) = request.resolution.unwrap_or(DEFAULT_RESOLUTION);
        let assets_index = descriptor
            .asset_index
            .as_ref()
            .map(|a| a.id.clone())
            .or_else(|| descriptor.assets.clone())
            .unwrap_or_default();
        let assets_dir = self.layout.assets_dir();

        let mut vars = HashMap::new();
        let mut set = |k: &str, v: String| {
            vars.insert(k.to_string(), v);
        };
        set("auth_player_name", request.player_name.clone());
        set("auth_uuid", offline_uuid(&request.player_name));
        set("auth_access_token", "0".into());
        set("auth_xuid", String::new());
        set("clientid", String::new());
        set("user_type", "legacy".into());
        set("user_properties", "{}".into());
        set("version_name", descriptor.id.clone());
        set("version_type", descriptor.version_type.clone().unwrap_or_else(|| "release".into()));
        set("game_directory", path_string(&request.game_dir));
        set("assets_root", path_string(&assets_dir));
        set("game_assets", path_string(&assets_dir.join("virtual").join("legacy")));
        set("assets_index_name", assets_index);
        set("resolution_width", width.to_string());
        set("resolution_height", height.to_string());
        set("natives_directory", path_string(&self.layout.natives_dir(descriptor.client_jar_id())));
        set("library_directory", path_string(&self.layout.libraries_dir()));
        set("classpath_separator", self.os.classpath_separator().into());
        set("classpath", join_classpath(classpath, self.os));
        set("launcher_name", LAUNCHER_NAME.into());
        set("launcher_version", env!("CARGO_PKG_VERSION").into());
        vars
    }
}

/// Canonical form when the path exists, as given otherwise.
fn path_string(path: &Path) -> String {
    canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}
