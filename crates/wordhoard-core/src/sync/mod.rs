//! Bidirectional sync between the local store and the remote document store

mod batch;
mod clock;
mod engine;
mod error;
mod events;
mod identity;
mod listener;
pub mod merge;
mod score;
mod session;
mod sharing;

pub use batch::{BatchCommitter, CommitReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{PushReport, SignInReport, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use events::{EventBus, SyncEvent, EVENT_CAPACITY};
pub use identity::{authorize, validate_user_id, Identity, StaticEntitlement, SyncEntitlement};
pub use listener::{scope_collection, ListenerManager};
pub use merge::{merge, merge_with_outcome, MergeOutcome};
pub use score::{update_score, Answer, DEMOTED_SCORE, MASTERY_THRESHOLD, SCORE_FLOOR};
pub use session::{SessionRegistry, SyncSession};
pub use sharing::SharingService;
