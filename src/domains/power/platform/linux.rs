use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use crate::errors::WakeError;

use super::PlatformAdapter;

const WHO: &str = "Wakelink";

pub struct LinuxAdapter {
    inhibit_path: PathBuf,
}

impl LinuxAdapter {
    pub fn new() -> Result<Self, WakeError> {
        let path = which::which("systemd-inhibit").map_err(|e| {
            WakeError::config("systemd-inhibit", format!("systemd-inhibit not found in PATH: {e}"))
        })?;

        Ok(Self::with_path(path))
    }

    pub fn with_path(inhibit_path: PathBuf) -> Self {
        Self { inhibit_path }
    }
}

impl PlatformAdapter for LinuxAdapter {
    fn name(&self) -> &'static str {
        "systemd-inhibit"
    }

    fn build_command(&self, reason: &str) -> Result<Command, WakeError> {
        let mut cmd = Command::new(&self.inhibit_path);

        cmd.arg("--what=idle")
            .arg(format!("--who={WHO}"))
            .arg(format!("--why={reason}"))
            .arg("--mode=block")
            .arg("sleep")
            .arg("infinity");

        unsafe {
            cmd.pre_exec(|| {
                // Inhibitor must not outlive the context that holds it
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_idle_inhibitor_with_reason() {
        let adapter = LinuxAdapter::with_path(PathBuf::from("/usr/bin/systemd-inhibit"));
        let cmd = adapter.build_command("Timer running").unwrap();

        assert_eq!(cmd.get_program(), "/usr/bin/systemd-inhibit");
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--what=idle",
                "--who=Wakelink",
                "--why=Timer running",
                "--mode=block",
                "sleep",
                "infinity",
            ]
        );
    }
}
