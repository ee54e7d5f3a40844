pub mod bid;
pub mod entry;
pub mod id;
pub mod media;
pub mod money;
pub mod party;
pub mod playback;
pub mod view;

pub use bid::Bid;
pub use entry::{EntryStatus, QueueEntry, StatusAction};
pub use id::{generate_id, BidId, MediaId, PartyId, UserId};
pub use media::MediaItem;
pub use money::Pence;
pub use party::{Party, PartyType};
pub use playback::{PlaybackPointer, PlayerState};
pub use view::{QueueView, SortWindow, ViewState};
