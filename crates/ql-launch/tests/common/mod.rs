#![allow(dead_code)]

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ql_client::{ClientConfig, Endpoints, LauncherClient};
use ql_launch::{
    GameProcesses, LaunchCommand, LauncherUpdateInfo, Notice, ProcessSpawner, Prompter,
};
use ql_store::{CoreSettings, DataStore, ExperimentalSettings, LauncherSettings};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GAME_BYTES: &[u8] = b"quake champions binary";
pub const GAME_CODE: &str = "GC-1234";

pub struct Fixture {
    pub temp: TempDir,
    pub install_root: PathBuf,
    pub game_binary: PathBuf,
    pub store: Arc<DataStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let install_root = temp.path().join("qc");
        let bin_dir = install_root.join("client").join("bin").join("pc");
        std::fs::create_dir_all(&bin_dir).unwrap();
        let game_binary = bin_dir.join("QuakeChampions.exe");
        std::fs::write(&game_binary, GAME_BYTES).unwrap();

        let store = Arc::new(DataStore::in_dir(temp.path().join("data")));
        Self {
            temp,
            install_root,
            game_binary,
            store,
        }
    }

    pub fn core(&self) -> CoreSettings {
        CoreSettings {
            username: "player@example.com".to_string(),
            password: "hunter2".to_string(),
            file_path: self.game_binary.clone(),
            language: "de".to_string(),
            fingerprint: "FP-1".to_string(),
        }
    }

    pub async fn save(&self, launcher: LauncherSettings) {
        std::fs::create_dir_all(self.temp.path().join("data")).unwrap();
        self.store
            .save_configuration(&self.core(), &ExperimentalSettings::default(), &launcher)
            .await
            .unwrap();
    }

    pub fn client(&self, server: &MockServer) -> LauncherClient {
        LauncherClient::new(
            ClientConfig::new(Endpoints::all_at(&server.uri())),
            self.store.clone(),
        )
        .unwrap()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn auth_body(token: &str) -> Value {
    json!({
        "token": token,
        "session_id": "srv-session",
        "entitlement_ids": [48329]
    })
}

pub fn game_manifest(hash: &str) -> Value {
    json!({
        "id": 7,
        "date": "2024-05-01T12:00:00Z",
        "bver": "1.40.0",
        "hashes": [
            {"file": "client\\bin\\pc\\QuakeChampions.exe", "hash": hash}
        ]
    })
}

pub async fn mount_status(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/status/ext-server-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "platform": {"code": 200, "message": "success", "response": {"Quake": "UP"}}
        })))
        .mount(server)
        .await;
}

pub async fn mount_updates(server: &MockServer, latest: f32, game_hash: &str) {
    Mock::given(method("GET"))
        .and(path("/update/launcher"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latest": latest,
            "date": "2024-05-01T12:00:00Z",
            "url": "https://example.com/qlauncher"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/update/game"))
        .respond_with(ResponseTemplate::new(200).set_body_json(game_manifest(game_hash)))
        .mount(server)
        .await;
}

/// Entitlement, branch, launch-args and game-code endpoints
pub async fn mount_build_metadata(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/projects/get_from_entitlement/48329/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [{"id": 11, "name": "Quake Champions"}],
            "branches": [
                {"id": 3, "project": 12, "name": "Default", "build_id": 1},
                {"id": 100, "project": 11, "name": "default", "build_id": 555}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/11/branches/100/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "launchinfo_list": [8],
            "project": 11,
            "build": 555
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/11/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Quake Champions",
            "launchinfo_set": {
                "8": {
                    "exe_path": "client\\bin\\pc\\QuakeChampions.exe",
                    "launch_args": "--startup --set /Config/Bethesda/Language \\\"%LANGUAGE%\\\" --set /Config/GAME_CONFIG/bethesdaGameCode \\\"%GAMECODE%\\\""
                }
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdp-user/projects/11/gamecode/.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "gamecode": GAME_CODE,
            "project": 11
        })))
        .mount(server)
        .await;
}

#[derive(Default)]
pub struct RecordingSpawner {
    pub spawned: Mutex<Vec<LaunchCommand>>,
}

impl ProcessSpawner for RecordingSpawner {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32> {
        self.spawned.lock().unwrap().push(command.clone());
        Ok(4242)
    }
}

#[derive(Default)]
pub struct FakeProcesses {
    pub running: Vec<u32>,
    pub terminated: Mutex<Vec<u32>>,
}

impl GameProcesses for FakeProcesses {
    fn find(&self, _name: &str) -> Vec<u32> {
        if self.terminated.lock().unwrap().is_empty() {
            self.running.clone()
        } else {
            Vec::new()
        }
    }

    fn terminate(&self, pids: &[u32]) -> usize {
        self.terminated.lock().unwrap().extend_from_slice(pids);
        pids.len()
    }
}

#[derive(Default)]
pub struct RecordingPrompter {
    pub terminate: bool,
    pub download_update: bool,
    pub notices: Mutex<Vec<Notice>>,
    pub update_prompts: Mutex<Vec<LauncherUpdateInfo>>,
}

impl Prompter for RecordingPrompter {
    fn confirm_terminate(&self) -> bool {
        self.terminate
    }

    fn confirm_launcher_update(&self, info: &LauncherUpdateInfo) -> bool {
        self.update_prompts.lock().unwrap().push(info.clone());
        self.download_update
    }

    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
