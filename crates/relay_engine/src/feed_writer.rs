use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use relay_core::CandidateItem;
use rss::{ChannelBuilder, EnclosureBuilder, GuidBuilder, Item, ItemBuilder};

use crate::persist::{write_atomic, PersistError};

const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    pub output_path: PathBuf,
    pub title: String,
    /// Public page the feed describes.
    pub link: String,
    pub max_items: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("could not write feed: {0}")]
    Persist(#[from] PersistError),
}

/// Renders posts as an RSS 2.0 document with full bodies in `content:encoded`.
pub struct FeedWriter {
    settings: FeedSettings,
}

impl FeedWriter {
    pub fn new(settings: FeedSettings) -> Self {
        Self { settings }
    }

    pub fn output_path(&self) -> &Path {
        &self.settings.output_path
    }

    pub fn max_items(&self) -> usize {
        self.settings.max_items
    }

    /// Render `items` (newest first) to an RSS string.
    pub fn render(&self, items: &[CandidateItem]) -> String {
        let mut namespaces = BTreeMap::new();
        namespaces.insert("content".to_string(), CONTENT_NAMESPACE.to_string());

        let channel = ChannelBuilder::default()
            .title(self.settings.title.clone())
            .link(self.settings.link.clone())
            .description(format!(
                "آخر {} منشورات من {}",
                items.len(),
                self.settings.title
            ))
            .namespaces(namespaces)
            .items(items.iter().map(feed_item).collect::<Vec<_>>())
            .build();
        channel.to_string()
    }

    /// Render and atomically replace the feed file.
    pub fn write(&self, items: &[CandidateItem]) -> Result<PathBuf, FeedError> {
        let xml = self.render(items);
        let document = if xml.starts_with("<?xml") {
            xml
        } else {
            format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{xml}")
        };
        write_atomic(&self.settings.output_path, &document)?;
        Ok(self.settings.output_path.clone())
    }
}

fn feed_item(item: &CandidateItem) -> Item {
    let guid = GuidBuilder::default()
        .value(item.id.clone())
        .permalink(true)
        .build();
    let enclosure = item.image_url.as_ref().map(|url| {
        EnclosureBuilder::default()
            .url(url.clone())
            .length("0".to_string())
            .mime_type(image_mime_type(url).to_string())
            .build()
    });

    ItemBuilder::default()
        .link(Some(item.id.clone()))
        .guid(Some(guid))
        .content(Some(item.body.clone()))
        .pub_date(item.published.map(|dt| dt.to_rfc2822()))
        .enclosure(enclosure)
        .build()
}

fn image_mime_type(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "image/jpeg",
    }
}
