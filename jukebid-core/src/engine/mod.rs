pub mod ledger;
pub mod playback;
pub mod project;
pub mod reconcile;

pub use ledger::{BidLedger, BidSubmission, SubmissionState};
pub use playback::{PlaybackCoordinator, SyncEffect};
pub use project::{normalize_tag, project, SearchTerms};
pub use reconcile::{CanonicalQueue, Incoming, MergeOutcome, QueueEvent, ReconciliationEngine};
