use std::path::PathBuf;

use crate::args::FallbackReason;

/// Non-fatal conditions the front end should surface to the user
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ServersOffline,
    ServerStatusUnknown(String),
    /// Installed files differ from the manifest but enforcement is off
    HashMismatchIgnored { path: PathBuf },
    UpdateCheckFailed(String),
    LaunchArgsFallback(FallbackReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LauncherUpdateInfo {
    pub current: f32,
    pub latest: f32,
    pub date: Option<chrono::DateTime<chrono::Utc>>,
    pub url: String,
}

/// User interaction points of a launch attempt
pub trait Prompter: Send + Sync {
    /// The game is already running; `true` terminates it and continues
    fn confirm_terminate(&self) -> bool;

    /// A newer launcher exists; `true` aborts the launch to download it
    fn confirm_launcher_update(&self, info: &LauncherUpdateInfo) -> bool;

    fn notify(&self, notice: Notice);
}

/// Answers every question with a fixed value and drops notices
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoPrompter {
    pub terminate: bool,
    pub download_update: bool,
}

impl Prompter for AutoPrompter {
    fn confirm_terminate(&self) -> bool {
        self.terminate
    }

    fn confirm_launcher_update(&self, _info: &LauncherUpdateInfo) -> bool {
        self.download_update
    }

    fn notify(&self, notice: Notice) {
        tracing::debug!("Notice: {:?}", notice);
    }
}
