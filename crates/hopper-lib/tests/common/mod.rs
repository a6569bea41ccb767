//! Stub metadata services and recording sinks shared by the integration tests.
#![allow(dead_code)]

use hopper_lib::config::{Endpoints, TransportConfig};
use hopper_lib::{LogSink, PipelineConfig, ProgressSink};
use serde_json::json;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_JAR: &[u8] = b"client jar bytes";
pub const CORE_LIB: &[u8] = b"core library bytes";
pub const ASSET_ICON: &[u8] = b"icon asset";
pub const ASSET_SOUND: &[u8] = b"sound asset";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

/// Config rooted at `root` with every endpoint on the stub server and a
/// single attempt per download.
pub fn config_for(server: &MockServer, root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::with_root(root);
    config.endpoints = Endpoints::rooted_at(&server.uri());
    config.transport = TransportConfig {
        attempts: 1,
        attempt_timeout_secs: 5,
        retry_delay_secs: 0,
    };
    config.download_threads = 4;
    config
}

async fn serve(server: &MockServer, at: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Manifest, descriptor, client jar, one library and a two-object asset
/// index for `version`.
pub async fn mount_vanilla(server: &MockServer, version: &str) {
    let uri = server.uri();
    let icon_hash = sha1_hex(ASSET_ICON);
    let sound_hash = sha1_hex(ASSET_SOUND);
    let asset_index = serde_json::to_vec(&json!({
        "objects": {
            "icons/icon_16x16.png": { "hash": icon_hash, "size": ASSET_ICON.len() },
            "minecraft/sounds/click.ogg": { "hash": sound_hash, "size": ASSET_SOUND.len() }
        }
    }))
    .unwrap();

    let descriptor = json!({
        "id": version,
        "type": "release",
        "mainClass": "net.minecraft.client.main.Main",
        "arguments": {
            "game": [
                "--username", "${auth_player_name}",
                "--version", "${version_name}",
                "--gameDir", "${game_directory}",
                "--assetIndex", "${assets_index_name}",
                { "rules": [{ "action": "allow", "features": { "is_demo_user": true } }], "value": "--demo" }
            ],
            "jvm": [
                { "rules": [{ "action": "allow", "os": { "name": "osx" } }], "value": ["-XstartOnFirstThread"] },
                "-Djava.library.path=${natives_directory}",
                "-cp", "${classpath}"
            ]
        },
        "assetIndex": {
            "id": "5",
            "url": format!("{}/indexes/5.json", uri),
            "sha1": sha1_hex(&asset_index),
            "totalSize": ASSET_ICON.len() + ASSET_SOUND.len()
        },
        "assets": "5",
        "downloads": {
            "client": {
                "url": format!("{}/objects/client.jar", uri),
                "sha1": sha1_hex(CLIENT_JAR),
                "size": CLIENT_JAR.len()
            }
        },
        "libraries": [
            {
                "name": "com.example:core:1.0",
                "downloads": { "artifact": {
                    "path": "com/example/core/1.0/core-1.0.jar",
                    "url": format!("{}/libraries/com/example/core/1.0/core-1.0.jar", uri),
                    "sha1": sha1_hex(CORE_LIB),
                    "size": CORE_LIB.len()
                } }
            },
            {
                "name": "com.example:windows-only:1.0",
                "downloads": { "artifact": {
                    "path": "com/example/windows-only/1.0/windows-only-1.0.jar",
                    "url": format!("{}/libraries/com/example/windows-only/1.0/windows-only-1.0.jar", uri)
                } },
                "rules": [{ "action": "allow", "os": { "name": "windows" } }]
            }
        ]
    });

    let manifest = json!({
        "latest": { "release": version, "snapshot": version },
        "versions": [
            { "id": "1.19.4", "type": "release", "url": format!("{}/v1/1.19.4.json", uri), "releaseTime": "2023-03-14T12:56:18+00:00" },
            { "id": version, "type": "release", "url": format!("{}/v1/{}.json", uri, version), "releaseTime": "2023-06-12T13:25:51+00:00" }
        ]
    });

    serve(server, "/mc/game/version_manifest.json", serde_json::to_vec(&manifest).unwrap()).await;
    serve(server, &format!("/v1/{}.json", version), serde_json::to_vec(&descriptor).unwrap()).await;
    serve(server, "/objects/client.jar", CLIENT_JAR.to_vec()).await;
    serve(server, "/libraries/com/example/core/1.0/core-1.0.jar", CORE_LIB.to_vec()).await;
    serve(server, "/indexes/5.json", asset_index).await;
    serve(server, &format!("/resources/{}/{}", &icon_hash[..2], icon_hash), ASSET_ICON.to_vec()).await;
    serve(server, &format!("/resources/{}/{}", &sound_hash[..2], sound_hash), ASSET_SOUND.to_vec()).await;
}

/// Fabric loader profile for `game`/`loader` plus its two libraries.
pub async fn mount_fabric(server: &MockServer, game: &str, loader: &str) {
    let maven = format!("{}/fabric-maven/", server.uri());
    let profile = json!({
        "id": format!("fabric-loader-{}-{}", loader, game),
        "inheritsFrom": game,
        "type": "release",
        "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
        "arguments": { "game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "] },
        "libraries": [
            { "name": format!("net.fabricmc:fabric-loader:{}", loader), "url": maven },
            { "name": format!("net.fabricmc:intermediary:{}", game), "url": maven }
        ]
    });

    serve(
        server,
        &format!("/fabric/v2/versions/loader/{}/{}/profile/json", game, loader),
        serde_json::to_vec(&profile).unwrap(),
    )
    .await;
    serve(
        server,
        &format!("/fabric-maven/net/fabricmc/fabric-loader/{0}/fabric-loader-{0}.jar", loader),
        b"fabric loader".to_vec(),
    )
    .await;
    serve(
        server,
        &format!("/fabric-maven/net/fabricmc/intermediary/{0}/intermediary-{0}.jar", game),
        b"intermediary".to_vec(),
    )
    .await;
}

/// Records every progress value and log line it receives.
#[derive(Default)]
pub struct Recorder {
    pub progress: Mutex<Vec<i64>>,
    pub lines: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn progress_values(&self) -> Vec<i64> {
        self.progress.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl ProgressSink for Recorder {
    fn progress(&self, current: i64, _total: i64, _message: &str) {
        self.progress.lock().unwrap().push(current);
    }
}

impl LogSink for Recorder {
    fn log(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}
