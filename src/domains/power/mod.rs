//! Native keep-awake capability backed by a platform inhibitor process.

pub mod inhibitor;
pub mod platform;

pub use inhibitor::InhibitorAdapter;
pub use platform::{PlatformAdapter, default_adapter};
