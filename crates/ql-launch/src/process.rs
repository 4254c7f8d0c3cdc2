use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use sysinfo::{Pid, System};
use tracing::{debug, info, warn};

/// Running-process probe for the game executable
pub trait GameProcesses: Send + Sync {
    /// Pids of processes whose name matches `name` case-insensitively
    fn find(&self, name: &str) -> Vec<u32>;

    /// Returns how many of `pids` were signalled
    fn terminate(&self, pids: &[u32]) -> usize;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcesses;

impl GameProcesses for SystemProcesses {
    fn find(&self, name: &str) -> Vec<u32> {
        let mut system = System::new_all();
        system.refresh_all();
        system
            .processes()
            .iter()
            .filter(|(_, process)| process.name().to_string_lossy().eq_ignore_ascii_case(name))
            .map(|(pid, _)| pid.as_u32())
            .collect()
    }

    fn terminate(&self, pids: &[u32]) -> usize {
        let mut system = System::new_all();
        system.refresh_all();
        pids.iter()
            .filter(|pid| match system.process(Pid::from_u32(**pid)) {
                Some(process) => {
                    info!("Terminating process {}", pid);
                    process.kill()
                }
                None => {
                    warn!("Process {} is gone", pid);
                    false
                }
            })
            .count()
    }
}

/// Executable, working directory and the pre-assembled argument string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub working_dir: PathBuf,
    pub command_line: String,
}

impl LaunchCommand {
    /// Runs `program` from its own directory
    pub fn new(program: impl Into<PathBuf>, command_line: impl Into<String>) -> Self {
        let program = program.into();
        let working_dir = program
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            program,
            working_dir,
            command_line: command_line.into(),
        }
    }
}

pub trait ProcessSpawner: Send + Sync {
    /// Start the process detached and return its pid
    fn spawn(&self, command: &LaunchCommand) -> io::Result<u32>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl SystemSpawner {
    #[cfg(windows)]
    fn command(launch: &LaunchCommand) -> io::Result<Command> {
        use std::os::windows::process::CommandExt;

        let mut command = Command::new(&launch.program);
        // quoting is already part of the argument string
        command.raw_arg(&launch.command_line);
        Ok(command)
    }

    /// Splits the argument string into words; nothing in it is evaluated
    #[cfg(not(windows))]
    fn command(launch: &LaunchCommand) -> io::Result<Command> {
        let args = shell_words::split(&launch.command_line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mut command = Command::new(&launch.program);
        command.args(args);
        Ok(command)
    }
}

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, launch: &LaunchCommand) -> io::Result<u32> {
        let mut command = Self::command(launch)?;
        command.current_dir(&launch.working_dir);
        debug!("Starting {} in {}", launch.program.display(), launch.working_dir.display());

        let child = command.spawn()?;
        Ok(child.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_dir_is_binary_parent() {
        let cmd = LaunchCommand::new("/games/qc/client/bin/pc/QuakeChampions.exe", "--startup");
        assert_eq!(cmd.working_dir, PathBuf::from("/games/qc/client/bin/pc"));
        assert_eq!(cmd.command_line, "--startup");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_spawner_runs_in_working_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("game.sh");
        std::fs::write(&script, "#!/bin/sh\npwd > out.txt\necho \"$1\" >> out.txt\n").unwrap();

        let cmd = LaunchCommand::new("/bin/sh", "");
        let cmd = LaunchCommand {
            working_dir: temp.path().to_path_buf(),
            command_line: format!("'{}' \"quoted arg\"", script.display()),
            ..cmd
        };
        let pid = SystemSpawner.spawn(&cmd).unwrap();
        assert!(pid > 0);

        let out = temp.path().join("out.txt");
        for _ in 0..50 {
            if std::fs::read_to_string(&out).is_ok_and(|s| s.lines().count() == 2) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        let contents = std::fs::read_to_string(&out).unwrap();
        assert!(contents.ends_with("quoted arg\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_spawner_does_not_evaluate_arguments() {
        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("game.sh");
        std::fs::write(&script, "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\"; done > args.txt\n").unwrap();

        let cmd = LaunchCommand {
            program: PathBuf::from("/bin/sh"),
            working_dir: temp.path().to_path_buf(),
            command_line: format!(
                "'{}' --mode $(touch injected) `touch injected` ; touch injected",
                script.display()
            ),
        };
        SystemSpawner.spawn(&cmd).unwrap();

        let out = temp.path().join("args.txt");
        for _ in 0..50 {
            if std::fs::read_to_string(&out).is_ok_and(|s| s.lines().count() == 8) {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        let args = std::fs::read_to_string(&out).unwrap();
        assert!(args.lines().any(|line| line == "$(touch"));
        assert!(args.lines().any(|line| line == ";"));
        assert!(!temp.path().join("injected").exists());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_unbalanced_quotes_are_rejected() {
        let cmd = LaunchCommand::new("/bin/true", "--name \"unterminated");
        let err = SystemSpawner.spawn(&cmd).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
