use crate::CandidateItem;

/// Items a run must process, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub items: Vec<CandidateItem>,
    /// The watermark was not found in the source window, so everything visible was taken.
    pub gap_recovery: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Compute the new items given a newest-first snapshot and the last published id.
///
/// - watermark present and found: every item strictly newer than it;
/// - watermark present but aged out of the window: all items (gap recovery);
/// - no watermark: only the newest item.
pub fn resolve(filtered: &[CandidateItem], watermark: Option<&str>) -> ChangeSet {
    if filtered.is_empty() {
        return ChangeSet::default();
    }

    let (mut items, gap_recovery) = match watermark {
        None => (vec![filtered[0].clone()], false),
        Some(mark) => match filtered.iter().position(|item| item.id == mark) {
            Some(pos) => (filtered[..pos].to_vec(), false),
            None => (filtered.to_vec(), true),
        },
    };

    items.reverse();
    ChangeSet {
        items,
        gap_recovery,
    }
}
