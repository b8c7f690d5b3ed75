//! Discovery core: pure keyword state machine, filtering and dedup types.
mod dedup;
mod entry;
mod filter;
mod keywords;
mod snapshot;
mod status;
mod trigger;

pub use dedup::DedupIndex;
pub use entry::{CandidateEntry, VideoRecord};
pub use filter::{evaluate, FilterPolicy, Rejection, Script};
pub use keywords::parse_keywords;
pub use snapshot::ProgressSnapshot;
pub use status::{Keyword, KeywordStates, KeywordStatus, TransitionError};
pub use trigger::{new_keywords, RunTrigger};
