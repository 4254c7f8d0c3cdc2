use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Authenticates, checks the install and starts Quake Champions.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[clap(long, global = true)]
    pub debug: bool,

    /// Send API requests to a local test server instead of the live services
    #[clap(long, global = true)]
    pub local: bool,

    /// Address of the local test server
    #[clap(long, global = true, value_name = "HOST:PORT")]
    pub local_addr: Option<String>,

    /// Client app version header; defaults to the build version reported by the update service
    #[clap(long, global = true)]
    pub app_version: Option<String>,

    /// Client library version header
    #[clap(long, global = true)]
    pub lib_version: Option<String>,

    /// Seconds between update checks
    #[clap(long, global = true, value_name = "SECS")]
    pub update_interval: Option<u64>,

    /// Skip the launcher update and game integrity checks
    #[clap(long, global = true)]
    pub skip_updates: bool,

    /// Refuse to launch when installed files differ from the latest build
    #[clap(long, global = true, action = ArgAction::Set, value_name = "BOOL")]
    pub enforce_hash: Option<bool>,

    /// Frame rate cap; overrides the saved setting when non-zero
    #[clap(long, global = true)]
    pub max_fps: Option<u32>,

    /// Extra arguments appended to the game command line
    #[clap(long, global = true, allow_hyphen_values = true)]
    pub custom_args: Option<String>,

    /// Directory the update manifest paths are relative to
    #[clap(long, global = true, value_name = "DIR")]
    pub install_root: Option<PathBuf>,

    /// Where the data file, lock and log live
    #[clap(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Hardware fingerprint to use instead of running the helper
    #[clap(long, global = true)]
    pub fingerprint: Option<String>,

    /// Path to the fingerprint helper executable
    #[clap(long, global = true, value_name = "FILE")]
    pub fp_helper: Option<PathBuf>,

    /// Settings file; defaults to launcher.toml in the data directory
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Start the game (default)
    Launch,
    /// Verify credentials and save settings
    Setup(SetupArgs),
    /// Delete the data file
    Reset {
        /// Do not ask for confirmation
        #[clap(long)]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    #[clap(long)]
    pub username: String,

    /// Asked for on stdin when neither the flag nor the variable is set
    #[clap(long, env = "QLAUNCHER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Full path to QuakeChampions.exe
    #[clap(long, value_name = "FILE")]
    pub game_path: PathBuf,

    #[clap(long, default_value = "en")]
    pub language: String,

    /// Saved frame rate cap
    #[clap(long)]
    pub max_fps_limit: Option<u32>,

    /// Saved frame rate cap while minimized
    #[clap(long)]
    pub max_fps_limit_minimized: Option<u32>,

    #[clap(long)]
    pub fps_smoothing: bool,

    #[clap(long)]
    pub auto_start: bool,

    #[clap(long)]
    pub exit_on_launch: bool,

    #[clap(long)]
    pub minimize_on_launch: bool,

    #[clap(long)]
    pub minimize_to_tray: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_launch_flags() {
        let cli = Cli::parse_from(["qlauncher", "--enforce-hash", "false", "--max-fps", "240"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.enforce_hash, Some(false));
        assert_eq!(cli.max_fps, Some(240));
    }

    #[test]
    fn test_setup_subcommand() {
        let cli = Cli::parse_from([
            "qlauncher",
            "--debug",
            "setup",
            "--username",
            "player@example.com",
            "--password",
            "pw",
            "--game-path",
            "C:/QC/client/bin/pc/QuakeChampions.exe",
            "--max-fps-limit",
            "144",
        ]);
        assert!(cli.debug);
        let Some(Command::Setup(args)) = cli.command else {
            panic!("expected setup");
        };
        assert_eq!(args.language, "en");
        assert_eq!(args.password.as_deref(), Some("pw"));
        assert_eq!(args.max_fps_limit, Some(144));
        assert!(!args.fps_smoothing);
    }

    #[test]
    fn test_custom_args_accept_leading_dashes() {
        let cli = Cli::parse_from(["qlauncher", "--custom-args", "--set /Config/X 1", "launch"]);
        assert_eq!(cli.custom_args.as_deref(), Some("--set /Config/X 1"));
        assert!(matches!(cli.command, Some(Command::Launch)));
    }

    #[test]
    fn test_setup_password_from_environment() {
        // SAFETY: only this test sets the variable
        unsafe { std::env::set_var("QLAUNCHER_PASSWORD", "from-env") };
        let cli = Cli::parse_from([
            "qlauncher",
            "setup",
            "--username",
            "player@example.com",
            "--game-path",
            "C:/QC/client/bin/pc/QuakeChampions.exe",
        ]);
        unsafe { std::env::remove_var("QLAUNCHER_PASSWORD") };

        let Some(Command::Setup(args)) = cli.command else {
            panic!("expected setup");
        };
        assert_eq!(args.password.as_deref(), Some("from-env"));
    }
}
