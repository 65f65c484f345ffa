use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use crate::{reformat_text, CandidateItem, ChangeSet, Effect, FilterRules, ItemId};

pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub rules: FilterRules,
    /// Pause between successive item publishes.
    pub cooldown: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            rules: FilterRules::default(),
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Filtering,
    Resolving,
    Transforming,
    Publishing,
    Committing,
    Done,
    Halted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    SourceUnavailable {
        message: String,
    },
    TransformFailure {
        id: ItemId,
        message: String,
    },
    /// Destination rejected the request; not retried.
    PublishTerminal {
        id: ItemId,
        attempts: u32,
        message: String,
    },
    /// Transient failures used up every attempt.
    PublishExhausted {
        id: ItemId,
        attempts: u32,
        message: String,
    },
    PersistenceFailure {
        id: ItemId,
        message: String,
    },
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::SourceUnavailable { message } => {
                write!(f, "source unavailable: {message}")
            }
            HaltReason::TransformFailure { id, message } => {
                write!(f, "transform failed for {id}: {message}")
            }
            HaltReason::PublishTerminal {
                id,
                attempts,
                message,
            } => write!(
                f,
                "publish rejected for {id} after {attempts} attempt(s): {message}"
            ),
            HaltReason::PublishExhausted {
                id,
                attempts,
                message,
            } => write!(
                f,
                "publish retries exhausted for {id} after {attempts} attempt(s): {message}"
            ),
            HaltReason::PersistenceFailure { id, message } => {
                write!(f, "watermark write failed for {id}: {message}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NothingNew,
    Completed,
    Halted(HaltReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Ids committed this run, oldest first.
    pub published: Vec<ItemId>,
    /// Eligible items after filtering.
    pub candidates: usize,
    pub dropped: usize,
    pub gap_recovery: bool,
    pub watermark: Option<ItemId>,
}

/// State of one sync pass. Driven exclusively through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    stage: Stage,
    settings: SyncSettings,
    watermark: Option<ItemId>,
    pending: VecDeque<CandidateItem>,
    current: Option<CandidateItem>,
    published: Vec<ItemId>,
    candidates: usize,
    dropped: usize,
    gap_recovery: bool,
    halt: Option<HaltReason>,
}

impl RunState {
    /// Begin a run from the persisted watermark; the first effect fetches the source.
    pub fn start(watermark: Option<ItemId>, settings: SyncSettings) -> (Self, Vec<Effect>) {
        let state = Self {
            stage: Stage::Fetching,
            settings,
            watermark,
            pending: VecDeque::new(),
            current: None,
            published: Vec::new(),
            candidates: 0,
            dropped: 0,
            gap_recovery: false,
            halt: None,
        };
        (state, vec![Effect::FetchSource])
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn watermark(&self) -> Option<&str> {
        self.watermark.as_deref()
    }

    pub fn current(&self) -> Option<&CandidateItem> {
        self.current.as_ref()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn published(&self) -> &[ItemId] {
        &self.published
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn gap_recovery(&self) -> bool {
        self.gap_recovery
    }

    pub fn halt_reason(&self) -> Option<&HaltReason> {
        self.halt.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Done | Stage::Halted)
    }

    pub fn report(&self) -> RunReport {
        let outcome = match (&self.halt, self.published.is_empty()) {
            (Some(reason), _) => RunOutcome::Halted(reason.clone()),
            (None, true) => RunOutcome::NothingNew,
            (None, false) => RunOutcome::Completed,
        };
        RunReport {
            outcome,
            published: self.published.clone(),
            candidates: self.candidates,
            dropped: self.dropped,
            gap_recovery: self.gap_recovery,
            watermark: self.watermark.clone(),
        }
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn record_filtering(&mut self, candidates: usize, dropped: usize) {
        self.candidates = candidates;
        self.dropped = dropped;
    }

    pub(crate) fn load_change_set(&mut self, change_set: ChangeSet) {
        self.gap_recovery = change_set.gap_recovery;
        self.pending = change_set.items.into();
    }

    pub(crate) fn is_current(&self, id: &str) -> bool {
        self.current.as_ref().is_some_and(|item| item.id == id)
    }

    /// Move the next pending item in flight and return its transform effect.
    pub(crate) fn begin_next_item(&mut self) -> Option<Effect> {
        let item = self.pending.pop_front()?;
        let effect = Effect::Transform {
            id: item.id.clone(),
            body: reformat_text(&item.body),
        };
        self.current = Some(item);
        self.stage = Stage::Transforming;
        Some(effect)
    }

    pub(crate) fn commit(&mut self, id: ItemId) {
        self.current = None;
        self.published.push(id.clone());
        self.watermark = Some(id);
    }

    pub(crate) fn halt(&mut self, reason: HaltReason) {
        self.current = None;
        self.pending.clear();
        self.halt = Some(reason);
        self.stage = Stage::Halted;
    }
}
