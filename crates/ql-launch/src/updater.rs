use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};

use ql_client::{ClientConfig, FileHash, GameUpdateResponse, LauncherClient, PROBE_TIMEOUT};
use ql_store::{DataStore, UpdateKind};

use crate::errors::{LaunchError, Result};
use crate::prompt::{LauncherUpdateInfo, Notice, Prompter};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(129_600);

/// Location of the game binary below the install root
pub const RELATIVE_GAME_BINARY: [&str; 4] = ["client", "bin", "pc", "QuakeChampions.exe"];

/// State shared by the steps of one run
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Game update manifest, fetched at most once per run
    pub cached_manifest: Option<GameUpdateResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherUpdateDecision {
    Continue,
    Download { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    NotDue,
    Verified { files: usize },
    MismatchIgnored { path: PathBuf },
    /// Manifest could not be fetched; the check is retried next run
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Copy)]
pub struct UpdatePolicy {
    pub interval: Duration,
    pub enforce_hash: bool,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_UPDATE_INTERVAL,
            enforce_hash: true,
        }
    }
}

pub fn is_update_due(last_check: i64, now: i64, interval: Duration) -> bool {
    last_check == 0 || now.saturating_sub(last_check) > interval.as_secs() as i64
}

/// Directory the manifest paths are relative to.
///
/// An explicit root wins. Otherwise the known binary location is stripped
/// from `game_binary`, falling back to the binary's parent directory.
pub fn resolve_install_root(game_binary: &Path, configured: Option<&Path>) -> PathBuf {
    if let Some(root) = configured {
        return root.to_path_buf();
    }

    let components: Vec<_> = game_binary.components().collect();
    if components.len() > RELATIVE_GAME_BINARY.len() {
        let split = components.len() - RELATIVE_GAME_BINARY.len();
        let tail_matches = components[split..]
            .iter()
            .zip(RELATIVE_GAME_BINARY)
            .all(|(c, expected)| c.as_os_str().to_string_lossy().eq_ignore_ascii_case(expected));
        if tail_matches {
            return components[..split].iter().collect();
        }
    }

    game_binary
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Manifest entries use either separator and must stay below `root`.
///
/// `None` for absolute paths, drive prefixes and `..` components.
fn manifest_path(root: &Path, file: &str) -> Option<PathBuf> {
    if file.starts_with(['/', '\\']) {
        return None;
    }
    let mut path = root.to_path_buf();
    for part in file.split(['/', '\\']).filter(|part| !part.is_empty()) {
        if part == ".." || part.contains(':') {
            return None;
        }
        if part != "." {
            path.push(part);
        }
    }
    Some(path)
}

pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn verify_manifest_blocking(root: &Path, hashes: &[FileHash]) -> Result<usize> {
    for entry in hashes {
        let Some(path) = manifest_path(root, &entry.file) else {
            error!("Manifest entry {} points outside the install root", entry.file);
            return Err(LaunchError::HashMismatch {
                path: PathBuf::from(&entry.file),
                expected: entry.hash.clone(),
                actual: None,
            });
        };
        let actual = match sha256_file(&path) {
            Ok(digest) => digest,
            Err(e) => {
                error!("Unable to hash {}: {}", path.display(), e);
                return Err(LaunchError::HashMismatch {
                    path,
                    expected: entry.hash.clone(),
                    actual: None,
                });
            }
        };

        if !actual.eq_ignore_ascii_case(&entry.hash) {
            error!(
                "File hash mismatch for {}: local {}, expected {}",
                path.display(),
                actual.to_uppercase(),
                entry.hash
            );
            return Err(LaunchError::HashMismatch {
                path,
                expected: entry.hash.clone(),
                actual: Some(actual),
            });
        }
        debug!("Hash match for {}", path.display());
    }
    Ok(hashes.len())
}

/// Hash every manifest entry below `root`; stops at the first mismatch
pub async fn verify_manifest(root: &Path, hashes: &[FileHash]) -> Result<usize> {
    let root = root.to_path_buf();
    let hashes = hashes.to_vec();
    tokio::task::spawn_blocking(move || verify_manifest_blocking(&root, &hashes))
        .await
        .map_err(|e| LaunchError::Io(io::Error::other(e)))?
}

/// Fetch the game manifest once at startup with the short probe timeout.
///
/// When the version headers were left at their defaults they are replaced
/// by the manifest's build version. A failed probe only logs.
#[instrument(skip_all)]
pub async fn probe_versions(
    config: ClientConfig,
    store: Arc<DataStore>,
) -> Result<(LauncherClient, RunState)> {
    let client = LauncherClient::new(config.clone(), store.clone())?;
    let probe = client.with_timeout(PROBE_TIMEOUT)?;

    match probe.game_update().await {
        Ok(manifest) => {
            let client = if config.uses_default_versions() && !manifest.bver.is_empty() {
                let mut config = config;
                config.adopt_build_version(&manifest.bver);
                info!("Using build version {} for client headers", manifest.bver);
                LauncherClient::new(config, store)?
            } else {
                client
            };
            let state = RunState {
                cached_manifest: Some(manifest),
            };
            Ok((client, state))
        }
        Err(e) => {
            warn!("Version probe failed: {}", e);
            Ok((client, RunState::default()))
        }
    }
}

/// Time-gated launcher and game update checks
pub struct UpdateChecker<'a> {
    client: &'a LauncherClient,
    prompter: &'a dyn Prompter,
    policy: UpdatePolicy,
    install_root: PathBuf,
}

impl<'a> UpdateChecker<'a> {
    pub fn new(
        client: &'a LauncherClient,
        prompter: &'a dyn Prompter,
        policy: UpdatePolicy,
        install_root: PathBuf,
    ) -> Self {
        Self {
            client,
            prompter,
            policy,
            install_root,
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[instrument(skip(self))]
    pub async fn check_launcher_update(&self) -> Result<LauncherUpdateDecision> {
        let store = self.client.store();
        let now = Self::now();
        let times = store.last_update_times().await?;
        if !is_update_due(times.last_launcher_check, now, self.policy.interval) {
            debug!("Launcher update check not due");
            return Ok(LauncherUpdateDecision::Continue);
        }

        let latest = match self.client.launcher_update().await {
            Ok(latest) => latest,
            Err(e) => {
                warn!("Launcher update check failed: {}", e);
                self.prompter.notify(Notice::UpdateCheckFailed(e.to_string()));
                return Ok(LauncherUpdateDecision::Continue);
            }
        };
        store.set_last_check_time(UpdateKind::Launcher, now).await?;

        let current = self.client.config().launcher_version;
        if latest.latest <= current {
            debug!("Launcher {:.2} is current", current);
            return Ok(LauncherUpdateDecision::Continue);
        }

        info!("Launcher update available: {:.2} -> {:.2}", current, latest.latest);
        let info = LauncherUpdateInfo {
            current,
            latest: latest.latest,
            date: latest.date,
            url: latest.url,
        };
        if self.prompter.confirm_launcher_update(&info) {
            Ok(LauncherUpdateDecision::Download { url: info.url })
        } else {
            Ok(LauncherUpdateDecision::Continue)
        }
    }

    /// Compare installed files against the manifest.
    ///
    /// With enforcement a mismatch resets the timestamp to zero and fails;
    /// without it the mismatch is reported and the timestamp advances.
    #[instrument(skip(self, state))]
    pub async fn check_game_integrity(&self, state: &mut RunState) -> Result<IntegrityStatus> {
        let store = self.client.store();
        let now = Self::now();
        let times = store.last_update_times().await?;
        if !is_update_due(times.last_game_check, now, self.policy.interval) {
            debug!("Game integrity check not due");
            return Ok(IntegrityStatus::NotDue);
        }

        let manifest = match state.cached_manifest.clone() {
            Some(manifest) => {
                debug!("Using cached game manifest");
                manifest
            }
            None => match self.client.game_update().await {
                Ok(manifest) => {
                    state.cached_manifest = Some(manifest.clone());
                    manifest
                }
                Err(e) => {
                    warn!("Game update check failed: {}", e);
                    self.prompter.notify(Notice::UpdateCheckFailed(e.to_string()));
                    return Ok(IntegrityStatus::Unavailable {
                        reason: e.to_string(),
                    });
                }
            },
        };

        match verify_manifest(&self.install_root, &manifest.hashes).await {
            Ok(files) => {
                store.set_last_check_time(UpdateKind::Game, now).await?;
                info!("Verified {} game files", files);
                Ok(IntegrityStatus::Verified { files })
            }
            Err(LaunchError::HashMismatch {
                path,
                expected,
                actual,
            }) => {
                if self.policy.enforce_hash {
                    store.set_last_check_time(UpdateKind::Game, 0).await?;
                    return Err(LaunchError::HashMismatch {
                        path,
                        expected,
                        actual,
                    });
                }
                warn!("Launching despite hash mismatch for {}", path.display());
                store.set_last_check_time(UpdateKind::Game, now).await?;
                self.prompter
                    .notify(Notice::HashMismatchIgnored { path: path.clone() });
                Ok(IntegrityStatus::MismatchIgnored { path })
            }
            Err(e) => Err(e),
        }
    }
}
