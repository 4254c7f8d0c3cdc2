use std::io::{self, BufRead, Write};

use ql_launch::{LauncherUpdateInfo, Notice, Prompter};
use tracing::warn;

use crate::presentation::notice_message;

/// Yes/no question on stderr; anything but "y"/"yes" is no
pub fn confirm(question: &str) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "{} [y/N] ", question).and_then(|_| stderr.flush()).is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(e) => {
            warn!("Unable to read answer: {}", e);
            false
        }
    }
}

/// Read one line from stdin after printing `label` on stderr
pub fn ask(label: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}: ", label)?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompter for interactive terminal sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn confirm_terminate(&self) -> bool {
        confirm("Quake Champions is already running. Close it and start again?")
    }

    fn confirm_launcher_update(&self, info: &LauncherUpdateInfo) -> bool {
        let date = info
            .date
            .map(|d| d.format("%a %b %e %H:%M:%S %Z %Y").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        eprintln!(
            "An update is available for qlauncher!\nYour version: {:.2}\nLatest version: {:.2}\nDate: {}",
            info.current, info.latest, date
        );
        confirm("Exit and go to the download site?")
    }

    fn notify(&self, notice: Notice) {
        eprintln!("warning: {}", notice_message(&notice));
    }
}
