use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use ql_client::Endpoints;
use ql_launch::{DEFAULT_UPDATE_INTERVAL, LaunchOptions, UpdatePolicy};

use crate::cli::Cli;

pub const CONFIG_FILE_NAME: &str = "launcher.toml";
pub const DEFAULT_LOCAL_ADDR: &str = "127.0.0.1:8000";

/// Optional settings file; command-line flags win over every field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub local_addr: Option<String>,
    pub app_version: Option<String>,
    pub lib_version: Option<String>,
    pub update_interval: Option<u64>,
    pub enforce_hash: Option<bool>,
    pub max_fps: Option<u32>,
    pub custom_args: Option<String>,
    pub install_root: Option<PathBuf>,
    pub fp_helper: Option<PathBuf>,
}

impl FileConfig {
    /// A missing file is an empty config
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Invalid settings file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Unable to read {}", path.display())),
        }
    }
}

/// Everything the run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub debug: bool,
    pub endpoints: Endpoints,
    pub app_version: Option<String>,
    pub lib_version: Option<String>,
    pub launch: LaunchOptions,
    pub fingerprint: Option<String>,
    pub fp_helper: Option<PathBuf>,
}

pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "qlauncher")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self> {
        let data_dir = cli.data_dir.clone().unwrap_or_else(default_data_dir);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));
        let file = FileConfig::load(&config_path)?;
        Ok(Self::merge(cli, file, data_dir))
    }

    pub fn merge(cli: &Cli, file: FileConfig, data_dir: PathBuf) -> Self {
        let endpoints = if cli.local {
            let addr = cli
                .local_addr
                .clone()
                .or(file.local_addr)
                .unwrap_or_else(|| DEFAULT_LOCAL_ADDR.to_string());
            Endpoints::local(&addr)
        } else {
            Endpoints::remote()
        };

        let interval = cli
            .update_interval
            .or(file.update_interval)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_UPDATE_INTERVAL);

        let launch = LaunchOptions {
            update: UpdatePolicy {
                interval,
                enforce_hash: cli.enforce_hash.or(file.enforce_hash).unwrap_or(true),
            },
            skip_updates: cli.skip_updates,
            custom_args: cli.custom_args.clone().or(file.custom_args),
            max_fps: cli.max_fps.or(file.max_fps),
            install_root: cli.install_root.clone().or(file.install_root),
        };

        Self {
            data_dir,
            debug: cli.debug,
            endpoints,
            app_version: cli.app_version.clone().or(file.app_version),
            lib_version: cli.lib_version.clone().or(file.lib_version),
            launch,
            fingerprint: cli.fingerprint.clone(),
            fp_helper: cli.fp_helper.clone().or(file.fp_helper),
        }
    }
}
