//! Relay core: pure filtering, change-set resolution and the sync state machine.
mod effect;
mod filter;
mod item;
mod msg;
mod reformat;
mod resolve;
mod state;
mod update;

pub use effect::Effect;
pub use filter::{
    check_item, filter_items, normalize_whitespace, word_count, FilterRules, Rejection,
    EXCLUDED_EXTENSIONS, MIN_WORDS, SKIP_MARKER,
};
pub use item::{CandidateItem, ItemId, MediaKind, RawItem};
pub use msg::Msg;
pub use reformat::reformat_text;
pub use resolve::{resolve, ChangeSet};
pub use state::{
    HaltReason, RunOutcome, RunReport, RunState, Stage, SyncSettings, DEFAULT_COOLDOWN,
};
pub use update::update;
