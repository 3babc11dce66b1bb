use std::process::Command;

use crate::errors::WakeError;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;

pub trait PlatformAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the inhibitor command. The display stays awake for as long as the process runs.
    fn build_command(&self, reason: &str) -> Result<Command, WakeError>;
}

#[cfg(target_os = "linux")]
pub fn default_adapter() -> Result<Box<dyn PlatformAdapter>, WakeError> {
    Ok(Box::new(linux::LinuxAdapter::new()?))
}

#[cfg(target_os = "macos")]
pub fn default_adapter() -> Result<Box<dyn PlatformAdapter>, WakeError> {
    Ok(Box::new(macos::MacOsAdapter::new()?))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn default_adapter() -> Result<Box<dyn PlatformAdapter>, WakeError> {
    Err(WakeError::CapabilityUnavailable {
        platform: std::env::consts::OS.to_string(),
    })
}
