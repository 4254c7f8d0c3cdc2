use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use ql_client::{LauncherClient, ServerHealth, SessionManager};
use ql_store::{GAME_EXECUTABLE, LauncherSettings};

use crate::args::{ExtractedArgs, apply_game_code, build_final_args, extract_launch_args};
use crate::errors::{LaunchError, Result};
use crate::process::{GameProcesses, LaunchCommand, ProcessSpawner, SystemProcesses, SystemSpawner};
use crate::prompt::{AutoPrompter, Notice, Prompter};
use crate::updater::{
    LauncherUpdateDecision, RunState, UpdateChecker, UpdatePolicy, resolve_install_root,
};

/// Immutable per-run launch settings taken from the command line
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub update: UpdatePolicy,
    pub skip_updates: bool,
    pub custom_args: Option<String>,
    /// Overrides the configured FPS limit when non-zero
    pub max_fps: Option<u32>,
    pub install_root: Option<PathBuf>,
}

/// What the front end should do once the game is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostLaunch {
    Exit,
    Minimize { to_tray: bool },
    Stay,
}

impl PostLaunch {
    pub fn from_settings(settings: &LauncherSettings) -> Self {
        if settings.exit_on_launch {
            Self::Exit
        } else if settings.minimize_on_launch {
            Self::Minimize {
                to_tray: settings.minimize_to_tray,
            }
        } else {
            Self::Stay
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub pid: u32,
    pub command: LaunchCommand,
    pub post_launch: PostLaunch,
}

/// Runs one launch attempt from process check to process start
pub struct Launcher {
    client: LauncherClient,
    options: LaunchOptions,
    prompter: Arc<dyn Prompter>,
    processes: Arc<dyn GameProcesses>,
    spawner: Arc<dyn ProcessSpawner>,
}

impl Launcher {
    pub fn new(client: LauncherClient, options: LaunchOptions) -> Self {
        Self {
            client,
            options,
            prompter: Arc::new(AutoPrompter::default()),
            processes: Arc::new(SystemProcesses),
            spawner: Arc::new(SystemSpawner),
        }
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_processes(mut self, processes: Arc<dyn GameProcesses>) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn client(&self) -> &LauncherClient {
        &self.client
    }

    fn ensure_not_running(&self) -> Result<()> {
        let pids = self.processes.find(GAME_EXECUTABLE);
        if pids.is_empty() {
            return Ok(());
        }
        info!("{} already running as {:?}", GAME_EXECUTABLE, pids);
        if !self.prompter.confirm_terminate() {
            return Err(LaunchError::AlreadyRunning);
        }
        let killed = self.processes.terminate(&pids);
        debug!("Terminated {} of {} processes", killed, pids.len());
        Ok(())
    }

    async fn report_server_status(&self) {
        match self.client.check_server_status().await {
            ServerHealth::Online => {}
            ServerHealth::Offline => self.prompter.notify(Notice::ServersOffline),
            ServerHealth::Unknown(reason) => {
                self.prompter.notify(Notice::ServerStatusUnknown(reason))
            }
        }
    }

    #[instrument(skip_all)]
    pub async fn launch(&self, state: &mut RunState) -> Result<LaunchOutcome> {
        self.ensure_not_running()?;

        let cfg = self.client.store().load_configuration().await.map_err(|e| {
            error!("Unable to load the data file during launch: {}", e);
            e
        })?;

        self.report_server_status().await;

        if self.options.skip_updates {
            debug!("Update checks disabled");
        } else {
            let install_root =
                resolve_install_root(&cfg.core.file_path, self.options.install_root.as_deref());
            let checker = UpdateChecker::new(
                &self.client,
                self.prompter.as_ref(),
                self.options.update,
                install_root,
            );
            if let LauncherUpdateDecision::Download { url } = checker.check_launcher_update().await? {
                return Err(LaunchError::UpdateRequested { url });
            }
            let status = checker.check_game_integrity(state).await?;
            debug!("Integrity check: {:?}", status);
        }

        let session = SessionManager::new(self.client.clone())
            .authenticate(&cfg)
            .await?;
        debug!("Authenticated: {:?}", session);

        let product = &self.client.config().product;
        let entitlement = self.client.entitlement_info().await?;
        let branch = entitlement
            .find_branch(product)
            .ok_or_else(|| LaunchError::IdentifiersNotFound {
                project_id: product.project_id,
                branch: product.branch_name.clone(),
            })?;
        let (project_id, branch_id) = (branch.project, branch.id);
        debug!("Project {} branch {} build {}", project_id, branch_id, branch.build);

        let branch_info = self.client.branch_info(project_id, branch_id).await?;
        let launch_args = self.client.launch_args(project_id).await?;

        let launch_info_key = branch_info.launchinfo_list.first().copied().unwrap_or_default();
        let extracted = extract_launch_args(Some(&launch_args), launch_info_key, &cfg.core.language);
        if let ExtractedArgs::Fallback { reason, .. } = &extracted {
            self.prompter.notify(Notice::LaunchArgsFallback(*reason));
        }

        let game_code = self.client.game_code(project_id).await?;
        let base_args = apply_game_code(extracted.as_str(), &game_code.gamecode);
        let final_args = build_final_args(
            &base_args,
            &cfg.experimental,
            self.options.custom_args.as_deref(),
            self.options.max_fps,
        );

        let command = LaunchCommand::new(cfg.core.file_path.clone(), final_args);
        let pid = self
            .spawner
            .spawn(&command)
            .map_err(|source| LaunchError::ProcessStart {
                program: command.program.clone(),
                source,
            })?;
        info!("Started {} (pid {})", command.program.display(), pid);

        Ok(LaunchOutcome {
            pid,
            command,
            post_launch: PostLaunch::from_settings(&cfg.launcher),
        })
    }
}
