pub mod capability;
pub mod core;
pub mod format;
pub mod memory;
mod sync;
pub mod timer;
pub mod types;

pub use capability::{Capability, CapabilityAdapter, CapabilityKind, RevocationSlot, UnsupportedAdapter};
pub use self::core::{CoreOptions, WakeLockCore};
pub use format::format_time;
pub use memory::MemoryAdapter;
pub use types::{TimerState, WakeLockSession, WakeSnapshot};
