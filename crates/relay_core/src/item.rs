use chrono::{DateTime, Utc};

/// Permalink-derived identifier. Compared by exact string equality only.
pub type ItemId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Audio,
    Video,
    Document,
}

/// An item as yielded by a source reader, before filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawItem {
    pub id: ItemId,
    /// Flattened text; may still carry redundant whitespace.
    pub body: String,
    pub image_url: Option<String>,
    pub media: Vec<MediaKind>,
    /// Every outbound href found in the item.
    pub links: Vec<String>,
    pub published: Option<DateTime<Utc>>,
}

/// An item that passed the content filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub id: ItemId,
    pub body: String,
    pub image_url: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl CandidateItem {
    pub fn new(id: impl Into<ItemId>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            image_url: None,
            published: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}
