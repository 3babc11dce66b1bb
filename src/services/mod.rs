pub mod context;
pub mod presentation;
pub mod surface;

pub use context::WakeLockContext;
pub use presentation::{PresentationAdapter, PresentationView};
pub use surface::DetachedSurface;
