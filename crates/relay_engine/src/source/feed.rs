use std::sync::Arc;

use feed_rs::model::{Entry, Link, Text};
use relay_core::{MediaKind, RawItem};
use relay_logging::relay_debug;

use super::text::html_fragment_text;
use super::{SourceError, SourceReader};
use crate::fetch::Fetcher;

/// Reads an RSS or Atom feed, such as the one written by the feed materializer.
pub struct FeedSource {
    url: String,
    fetcher: Arc<dyn Fetcher>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

#[async_trait::async_trait]
impl SourceReader for FeedSource {
    fn name(&self) -> &str {
        "feed"
    }

    async fn read(&self) -> Result<Vec<RawItem>, SourceError> {
        let output = self.fetcher.fetch(&self.url).await?;
        relay_debug!(
            "stage=fetch source=feed bytes={}",
            output.metadata.byte_len
        );
        parse_feed(&output.bytes)
    }
}

/// Parse feed bytes into raw items ordered newest first by publication date.
/// Undated entries follow the dated ones in document order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawItem>, SourceError> {
    let feed = feed_rs::parser::Builder::new()
        .id_generator(link_as_id)
        .build()
        .parse(bytes)
        .map_err(|err| SourceError::Parse(err.to_string()))?;
    let mut items: Vec<RawItem> = feed.entries.into_iter().filter_map(entry_to_item).collect();
    items.sort_by(|a, b| b.published.cmp(&a.published));
    Ok(items)
}

/// Entries without a guid are keyed by their first link, the channel permalink.
fn link_as_id(links: &[Link], _title: &Option<Text>, _base: Option<&str>) -> String {
    links
        .first()
        .map(|link| link.href.trim().to_string())
        .unwrap_or_default()
}

/// Feed bodies may be plain text with meaningful line breaks or HTML markup.
fn plain_body(raw: &str) -> String {
    if raw.contains('<') {
        html_fragment_text(raw)
    } else {
        raw.trim().to_string()
    }
}

fn entry_to_item(entry: Entry) -> Option<RawItem> {
    let first_link = entry.links.first().map(|link| link.href.trim().to_string());
    let id = if entry.id.trim().is_empty() {
        first_link.clone().filter(|href| !href.is_empty())?
    } else {
        entry.id.trim().to_string()
    };

    let html = entry
        .content
        .as_ref()
        .and_then(|content| content.body.clone())
        .or_else(|| entry.summary.as_ref().map(|text| text.content.clone()))
        .unwrap_or_default();

    let mut image_url = None;
    let mut media = Vec::new();
    for content in entry.media.iter().flat_map(|object| object.content.iter()) {
        let mime = content
            .content_type
            .as_ref()
            .map(|mime| mime.essence().to_string())
            .unwrap_or_default();
        let url = content.url.as_ref().map(|url| url.to_string());
        if mime.starts_with("audio/") {
            media.push(MediaKind::Audio);
        } else if mime.starts_with("video/") {
            media.push(MediaKind::Video);
        } else if image_url.is_none() && (mime.is_empty() || mime.starts_with("image/")) {
            image_url = url;
            media.push(MediaKind::Photo);
        }
    }

    let links = entry.links.iter().map(|link| link.href.clone()).collect();

    Some(RawItem {
        id,
        body: plain_body(&html),
        image_url,
        media,
        links,
        published: entry.published.or(entry.updated),
    })
}
