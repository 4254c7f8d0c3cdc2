//! Launch orchestration for qlauncher.
//!
//! [`Launcher::launch`] runs one attempt: process check, configuration load,
//! server status, update and integrity checks, authentication, build metadata
//! lookups, argument resolution and finally the process start. UI and OS
//! seams are traits ([`Prompter`], [`GameProcesses`], [`ProcessSpawner`],
//! [`FingerprintSource`]) so front ends and tests can supply their own.

pub mod args;
pub mod errors;
pub mod fingerprint;
pub mod lock;
pub mod orchestrator;
pub mod process;
pub mod prompt;
pub mod setup;
pub mod updater;

pub use args::{ExtractedArgs, FallbackReason, apply_game_code, build_final_args, extract_launch_args};
pub use errors::{ErrorKind, LaunchError, Result};
pub use fingerprint::{FingerprintSource, HelperFingerprint, StaticFingerprint};
pub use lock::InstanceLock;
pub use orchestrator::{LaunchOptions, LaunchOutcome, Launcher, PostLaunch};
pub use process::{GameProcesses, LaunchCommand, ProcessSpawner, SystemProcesses, SystemSpawner};
pub use prompt::{AutoPrompter, LauncherUpdateInfo, Notice, Prompter};
pub use setup::{SetupOutcome, SetupRequest, configure};
pub use updater::{
    DEFAULT_UPDATE_INTERVAL, IntegrityStatus, LauncherUpdateDecision, RunState, UpdateChecker,
    UpdatePolicy, is_update_due, probe_versions, resolve_install_root, verify_manifest,
};
