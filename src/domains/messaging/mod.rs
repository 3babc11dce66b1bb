pub mod channel;
pub mod message;
pub mod messenger;
pub mod origin;

pub use channel::{ChannelPort, Endpoint, SurfaceHandle, link};
pub use message::{Envelope, MessageKind, PROTOCOL_VERSION, SyncMessage};
pub use messenger::{CrossContextMessenger, PeerPort};
pub use origin::AppOrigin;
