use std::time::Duration;

use crate::ItemId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchSource,
    /// Run the text stage on an already reformatted body.
    Transform { id: ItemId, body: String },
    Publish {
        id: ItemId,
        body: String,
        image_url: Option<String>,
    },
    CommitWatermark { id: ItemId },
    /// Rate-limit pause between two item publishes.
    Cooldown(Duration),
}
