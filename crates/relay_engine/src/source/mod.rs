//! Source readers: where raw items come from.
//!
//! Both readers yield items newest first so the resolver does not care which
//! one is in use.

mod channel_page;
mod feed;
mod text;

pub use channel_page::{parse_channel_page, ChannelPageSource};
pub use feed::{parse_feed, FeedSource};

use relay_core::RawItem;

use crate::decode::DecodeError;
use crate::fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("could not parse source document: {0}")]
    Parse(String),
}

#[async_trait::async_trait]
pub trait SourceReader: Send + Sync {
    /// Short label for log lines.
    fn name(&self) -> &str;

    /// Current snapshot of the source, newest first.
    async fn read(&self) -> Result<Vec<RawItem>, SourceError>;
}
