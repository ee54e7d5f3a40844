pub mod channel;
pub mod message;

pub use channel::{PushChannel, PushTransport, SseTransport};
pub use message::{PartyMessage, QueueItemRef};
