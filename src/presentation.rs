use ql_client::ClientError;
use ql_launch::{ErrorKind, LaunchError, Notice};
use ql_store::DATA_FILE_NAME;

use crate::logging::LOG_FILE_NAME;

/// Text shown to the user for a failed attempt
pub fn user_message(err: &LaunchError) -> String {
    match err {
        LaunchError::Client(ClientError::StaleToken) => {
            "Your saved session expired and has been cleared. Please try launching again.".to_string()
        }
        LaunchError::Client(ClientError::CredentialMismatch) => {
            "The username and password must match your Bethesda.net account.".to_string()
        }
        LaunchError::InstanceLocked { .. } => "qlauncher is already running.".to_string(),
        LaunchError::UpdateRequested { url } => {
            format!("Download the new version of qlauncher from {}", url)
        }
        LaunchError::Settings(issue) => format!("Invalid settings: {}", issue),
        err => match err.kind() {
            ErrorKind::AlreadyRunning => {
                "Quake Champions is already running, cannot start.".to_string()
            }
            ErrorKind::HashMismatch => "One or more of your Quake Champions files did not match \
                 the newest version. Run the Bethesda Launcher to update the game."
                .to_string(),
            ErrorKind::MissingDataFile => format!(
                "No {} file was found. Run `qlauncher setup` to enter your settings.",
                DATA_FILE_NAME
            ),
            ErrorKind::StoreCorruption => format!(
                "Your {} file is incompatible with this version. Run `qlauncher reset` and then `qlauncher setup`.",
                DATA_FILE_NAME
            ),
            ErrorKind::AuthenticationFailed => {
                "Authentication with Bethesda.net failed. Check your username and password.".to_string()
            }
            ErrorKind::Transport => {
                "Unable to reach the Bethesda.net services. Check your connection and try again."
                    .to_string()
            }
            ErrorKind::Validation => format!(
                "Bethesda.net returned unexpected data. See {} for details.",
                LOG_FILE_NAME
            ),
            ErrorKind::Setup => format!("Setup failed: {}", err),
            ErrorKind::Internal => format!("{} (see {} for details)", err, LOG_FILE_NAME),
        },
    }
}

pub fn notice_message(notice: &Notice) -> String {
    match notice {
        Notice::ServersOffline => {
            "The Quake Champions servers are reported as down. Launching anyway.".to_string()
        }
        Notice::ServerStatusUnknown(_) => {
            "Unable to determine the server status. Launching anyway.".to_string()
        }
        Notice::HashMismatchIgnored { path } => format!(
            "{} does not match the newest version. Launching anyway, but it will probably be \
             unsuccessful. Run the Bethesda Launcher to update the game.",
            path.display()
        ),
        Notice::UpdateCheckFailed(reason) => format!("Update check skipped: {}", reason),
        Notice::LaunchArgsFallback(reason) => {
            format!("Using default launch arguments ({})", reason)
        }
    }
}
