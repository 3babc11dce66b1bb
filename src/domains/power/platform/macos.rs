use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::errors::WakeError;

use super::PlatformAdapter;

pub struct MacOsAdapter {
    caffeinate_path: PathBuf,
}

impl MacOsAdapter {
    pub fn new() -> Result<Self, WakeError> {
        let path = which::which("caffeinate").map_err(|e| {
            WakeError::config("caffeinate", format!("caffeinate not found in PATH: {e}"))
        })?;

        Ok(Self::with_path(path))
    }

    pub fn with_path(caffeinate_path: PathBuf) -> Self {
        Self { caffeinate_path }
    }
}

impl PlatformAdapter for MacOsAdapter {
    fn name(&self) -> &'static str {
        "caffeinate"
    }

    // caffeinate has no notion of a reason string
    fn build_command(&self, _reason: &str) -> Result<Command, WakeError> {
        let mut cmd = Command::new(&self.caffeinate_path);
        cmd.arg("-d") // prevent display sleep
            .arg("-i") // prevent idle sleep
            .arg("-u") // declare user active
            .arg("-w")
            .arg(std::process::id().to_string());

        cmd.process_group(0);

        Ok(cmd)
    }
}
