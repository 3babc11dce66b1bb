pub mod messaging;
pub mod power;
pub mod wake_lock;
