use tracing::{debug, info};

use ql_client::{LaunchArgsResponse, LaunchVariant};
use ql_store::ExperimentalSettings;

pub const GAME_CODE_PLACEHOLDER: &str = "%GAMECODE%";
pub const LANGUAGE_PLACEHOLDER: &str = "%LANGUAGE%";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Template used when the remote launch metadata is unusable
pub const DEFAULT_ARGS: &str = r#"--startup --set /Config/GAME_CONFIG/bethesdaGameCode "%GAMECODE%" --set /Config/GAME_CONFIG/bethesdaLoginEnabled 1 --set /Config/Bethesda/Language "%LANGUAGE%" --set /Config/GAME_CONFIG/bethesdaEndpointUrl "https://services.bethesda.net/agora_beam/""#;

/// Why the default template was used instead of the remote one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    MissingResponse,
    EmptyLaunchInfoSet,
    EmptyLaunchInfo,
    UnknownKey(u32),
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingResponse => f.write_str("launch args response was missing"),
            Self::EmptyLaunchInfoSet => f.write_str("launch info set had only default values"),
            Self::EmptyLaunchInfo => f.write_str("launch info item had only default values"),
            Self::UnknownKey(key) => write!(f, "launch info key {} had no match", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedArgs {
    Remote(String),
    Fallback { args: String, reason: FallbackReason },
}

impl ExtractedArgs {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Remote(args) => args,
            Self::Fallback { args, .. } => args,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Self::Remote(args) => args,
            Self::Fallback { args, .. } => args,
        }
    }
}

fn fallback(reason: FallbackReason) -> ExtractedArgs {
    info!("Using fallback launch arguments: {}", reason);
    ExtractedArgs::Fallback {
        args: DEFAULT_ARGS.replace(LANGUAGE_PLACEHOLDER, DEFAULT_LANGUAGE),
        reason,
    }
}

/// Resolve the launch-argument template for `launch_info_key`.
///
/// The remote template has backslashes stripped and the language substituted;
/// the game-code placeholder is left for [`apply_game_code`]. Any missing or
/// zero-valued structure yields the default template with the default
/// language.
pub fn extract_launch_args(
    response: Option<&LaunchArgsResponse>,
    launch_info_key: u32,
    language: &str,
) -> ExtractedArgs {
    let Some(response) = response else {
        return fallback(FallbackReason::MissingResponse);
    };
    let set = &response.launchinfo_set;
    if set.is_empty() {
        return fallback(FallbackReason::EmptyLaunchInfoSet);
    }
    let Some(variant) = LaunchVariant::from_key(launch_info_key) else {
        return fallback(FallbackReason::UnknownKey(launch_info_key));
    };
    let item = set.item(variant);
    if item.is_empty() || item.launch_args.is_empty() {
        return fallback(FallbackReason::EmptyLaunchInfo);
    }

    let args = item
        .launch_args
        .replace('\\', "")
        .replace(LANGUAGE_PLACEHOLDER, language);
    debug!("Extracted launch args for {:?}: {}", variant, args);
    ExtractedArgs::Remote(args)
}

pub fn apply_game_code(args: &str, game_code: &str) -> String {
    args.replace(GAME_CODE_PLACEHOLDER, game_code)
}

/// Append custom args and the FPS options to the resolved base arguments.
///
/// A non-zero `max_fps_override` wins over the configured limit.
pub fn build_final_args(
    base: &str,
    experimental: &ExperimentalSettings,
    custom_args: Option<&str>,
    max_fps_override: Option<u32>,
) -> String {
    let mut parts = vec![base.to_string()];

    if let Some(custom) = custom_args.map(str::trim).filter(|c| !c.is_empty()) {
        parts.push(custom.to_string());
    }

    match max_fps_override.filter(|fps| *fps != 0) {
        Some(fps) => parts.push(format!("--set /Config/CONFIG/maxFpsValue {}", fps)),
        None if experimental.use_max_fps_limit => parts.push(format!(
            "--set /Config/CONFIG/maxFpsValue {}",
            experimental.max_fps_limit
        )),
        None => {}
    }

    if experimental.use_max_fps_limit_minimized {
        parts.push(format!(
            "--set /Config/CONFIG/maxFpsValueMinimized {}",
            experimental.max_fps_limit_minimized
        ));
    }

    if experimental.use_fps_smoothing {
        parts.push("--set /Config/CONFIG/enableFpsSmooth 1".to_string());
    }

    parts.join(" ")
}
