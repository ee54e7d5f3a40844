pub mod api;
pub mod notify;
pub mod push;
pub mod session;

pub use api::{ApiClient, BidReceipt, PartyApi};
pub use notify::{Notification, NotificationHub, NotificationLevel};
pub use push::{PartyMessage, PushChannel, PushTransport, SseTransport};
pub use session::PartySession;
