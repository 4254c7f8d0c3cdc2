mod cli;
mod config;
mod console;
mod logging;
mod presentation;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use ql_client::config::random_source_fingerprint;
use ql_client::{ClientConfig, LauncherClient};
use ql_launch::{
    FingerprintSource, HelperFingerprint, InstanceLock, LaunchError, Launcher, PostLaunch,
    SetupRequest, StaticFingerprint, configure, probe_versions,
};
use ql_store::{CoreSettings, DataStore, ExperimentalSettings, LauncherSettings};

use crate::cli::{Cli, Command, SetupArgs};
use crate::config::AppConfig;
use crate::console::ConsolePrompter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<LaunchError>() {
                Some(launch_error) => eprintln!("error: {}", presentation::user_message(launch_error)),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = AppConfig::load(&cli)?;
    logging::init(&app.data_dir, app.debug)?;
    info!("qlauncher {} starting", env!("CARGO_PKG_VERSION"));

    let _lock = InstanceLock::acquire(&app.data_dir)?;
    let store = Arc::new(DataStore::in_dir(&app.data_dir));

    match cli.command.unwrap_or(Command::Launch) {
        Command::Launch => launch(&app, store).await?,
        Command::Setup(args) => setup(&app, store, args).await?,
        Command::Reset { yes } => reset(store, yes).await?,
    }
    Ok(())
}

/// Client configuration from the command line plus the stored fingerprint
async fn client_config(app: &AppConfig, store: &DataStore) -> ClientConfig {
    let mut config = ClientConfig::new(app.endpoints.clone());
    if let Some(version) = &app.app_version {
        config.app_version = version.clone();
    }
    if let Some(version) = &app.lib_version {
        config.lib_version = version.clone();
    }

    let stored = if store.exists().await {
        store
            .load_configuration()
            .await
            .map(|cfg| cfg.core.fingerprint)
            .ok()
            .filter(|fp| !fp.is_empty())
    } else {
        None
    };
    if let Some(fingerprint) = app.fingerprint.clone().or(stored) {
        config.source_fingerprint = fingerprint;
    }
    config
}

async fn launch(app: &AppConfig, store: Arc<DataStore>) -> Result<(), LaunchError> {
    let config = client_config(app, &store).await;
    let (client, mut state) = probe_versions(config, store).await?;

    let launcher = Launcher::new(client, app.launch.clone()).with_prompter(Arc::new(ConsolePrompter));
    let outcome = launcher.launch(&mut state).await?;

    println!("Started Quake Champions (pid {})", outcome.pid);
    match outcome.post_launch {
        PostLaunch::Exit | PostLaunch::Stay => {}
        PostLaunch::Minimize { to_tray } => info!("Minimize requested (tray: {})", to_tray),
    }
    Ok(())
}

fn fingerprint_source(app: &AppConfig) -> Box<dyn FingerprintSource> {
    if let Some(fingerprint) = &app.fingerprint {
        return Box::new(StaticFingerprint(fingerprint.clone()));
    }
    match &app.fp_helper {
        Some(helper) => Box::new(HelperFingerprint::new(helper, &app.data_dir)),
        None => {
            warn!("No fingerprint helper configured, using a generated fingerprint");
            Box::new(StaticFingerprint(random_source_fingerprint()))
        }
    }
}

async fn setup(app: &AppConfig, store: Arc<DataStore>, args: SetupArgs) -> Result<(), LaunchError> {
    let config = client_config(app, &store).await;
    let client = LauncherClient::new(config, store)?;
    let password = match args.password {
        Some(password) => password,
        None => console::ask("Password")?,
    };

    let request = SetupRequest {
        core: CoreSettings {
            username: args.username,
            password,
            file_path: args.game_path,
            language: args.language,
            fingerprint: String::new(),
        },
        experimental: ExperimentalSettings {
            use_max_fps_limit: args.max_fps_limit.is_some(),
            use_max_fps_limit_minimized: args.max_fps_limit_minimized.is_some(),
            use_fps_smoothing: args.fps_smoothing,
            max_fps_limit: args.max_fps_limit.unwrap_or_default(),
            max_fps_limit_minimized: args.max_fps_limit_minimized.unwrap_or_default(),
        },
        launcher: LauncherSettings {
            auto_start: args.auto_start,
            exit_on_launch: args.exit_on_launch,
            minimize_on_launch: args.minimize_on_launch,
            minimize_to_tray: args.minimize_to_tray,
        },
    };

    let fingerprints = fingerprint_source(app);
    let outcome = configure(&client, fingerprints.as_ref(), request).await?;
    if outcome.credentials_verified {
        println!("Credentials verified.");
    }
    println!("Settings saved to {}", client.store().path().display());
    Ok(())
}

async fn reset(store: Arc<DataStore>, yes: bool) -> Result<(), LaunchError> {
    if !yes && !console::confirm("Delete all saved settings?") {
        println!("Nothing changed.");
        return Ok(());
    }
    store.delete().await?;
    println!("Settings deleted. Run `qlauncher setup` to enter them again.");
    Ok(())
}
