pub mod config;
pub mod core;
pub mod modloaders;
pub mod types;
pub mod vanilla;


use crate::game::installer::core::traits::LoaderInstaller;
use crate::game::installer::modloaders::fabric::FabricInstaller;
use crate::game::installer::modloaders::forge::ForgeInstaller;
use crate::game::installer::modloaders::neoforge::NeoForgeInstaller;
use crate::game::installer::modloaders::quilt::QuiltInstaller;
use crate::game::installer::modloaders::server::{PaperInstaller, PurpurInstaller};
use crate::game::installer::vanilla::VanillaInstaller;
use crate::game::metadata::LoaderKind;

pub use self::core::batch::{FetchEngine, FetchItem, FetchReport};
pub use self::core::downloader::Transport;
pub use self::core::traits::{InstallContext, InstallOutcome};

/// Select the installer strategy for a loader family.
pub fn get_installer(loader: LoaderKind) -> Box<dyn LoaderInstaller> {
    match loader {
        LoaderKind::Vanilla => Box::new(VanillaInstaller),
        LoaderKind::Fabric => Box::new(FabricInstaller),
        LoaderKind::Quilt => Box::new(QuiltInstaller),
        LoaderKind::Forge => Box::new(ForgeInstaller),
        LoaderKind::NeoForge => Box::new(NeoForgeInstaller),
        LoaderKind::Paper => Box::new(PaperInstaller),
        LoaderKind::Purpur => Box::new(PurpurInstaller),
    }
}
