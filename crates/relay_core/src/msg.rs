use crate::{ItemId, RawItem};

/// Results reported back by the engine after executing an [`crate::Effect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Source snapshot, newest first.
    SourceFetched(Vec<RawItem>),
    /// The source could not be fetched or parsed.
    SourceFailed(String),
    /// Text stage finished for the item in flight.
    ItemTransformed { id: ItemId, body: String },
    /// Text stage gave up and the policy says the item must not be published.
    TransformFailed { id: ItemId, message: String },
    /// The destination accepted the post.
    ItemPublished { id: ItemId, attempts: u32 },
    /// The destination refused the post or retries ran out.
    PublishFailed {
        id: ItemId,
        attempts: u32,
        terminal: bool,
        message: String,
    },
    /// Watermark now points at `id`.
    WatermarkCommitted { id: ItemId },
    WatermarkFailed { id: ItemId, message: String },
}
