pub mod domains;
pub mod errors;
pub mod events;
pub mod infrastructure;
pub mod services;
pub mod shared;
pub mod utils;

pub use domains::wake_lock::format_time;
pub use errors::WakeError;
pub use infrastructure::config::WakeConfig;
pub use services::{DetachedSurface, PresentationAdapter, WakeLockContext};
