use std::sync::Arc;

use chrono::{DateTime, Utc};
use relay_core::{MediaKind, RawItem};
use relay_logging::relay_debug;
use scraper::{ElementRef, Html, Selector};

use super::text::element_text;
use super::{SourceError, SourceReader};
use crate::decode::decode_document;
use crate::fetch::Fetcher;

const PERMALINK_HOST: &str = "https://t.me";

/// Scrapes the public web preview of a channel (`https://t.me/s/<channel>`).
pub struct ChannelPageSource {
    url: String,
    fetcher: Arc<dyn Fetcher>,
}

impl ChannelPageSource {
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            url: url.into(),
            fetcher,
        }
    }
}

#[async_trait::async_trait]
impl SourceReader for ChannelPageSource {
    fn name(&self) -> &str {
        "channel-page"
    }

    async fn read(&self) -> Result<Vec<RawItem>, SourceError> {
        let output = self.fetcher.fetch(&self.url).await?;
        let decoded = decode_document(&output.bytes, output.metadata.content_type.as_deref())?;
        relay_debug!(
            "stage=fetch source=channel-page encoding={} bytes={}",
            decoded.encoding_label,
            output.metadata.byte_len
        );
        parse_channel_page(&decoded.text)
    }
}

struct Selectors {
    message: Selector,
    text: Selector,
    date: Selector,
    time: Selector,
    photo: Selector,
    audio: Selector,
    video: Selector,
    document: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Result<Self, SourceError> {
        Ok(Self {
            message: parse_selector("div.tgme_widget_message_wrap")?,
            text: parse_selector("div.tgme_widget_message_text")?,
            date: parse_selector("a.tgme_widget_message_date")?,
            time: parse_selector("time[datetime]")?,
            photo: parse_selector("a.tgme_widget_message_photo_wrap")?,
            audio: parse_selector("audio")?,
            video: parse_selector("video")?,
            document: parse_selector(".tgme_widget_message_document_wrap")?,
            anchor: parse_selector("a[href]")?,
        })
    }
}

fn parse_selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|err| SourceError::Parse(format!("selector {css}: {err:?}")))
}

/// Parse a channel preview page into raw items, newest first.
///
/// Messages without a text block or a permalink are skipped.
pub fn parse_channel_page(html: &str) -> Result<Vec<RawItem>, SourceError> {
    let selectors = Selectors::new()?;
    let document = Html::parse_document(html);

    let mut items: Vec<RawItem> = document
        .select(&selectors.message)
        .filter_map(|message| parse_message(message, &selectors))
        .collect();
    // The page lists messages oldest first.
    items.reverse();
    Ok(items)
}

fn parse_message(message: ElementRef<'_>, selectors: &Selectors) -> Option<RawItem> {
    let text = message.select(&selectors.text).next()?;
    let date = message.select(&selectors.date).next()?;
    let id = permalink(date.value().attr("href")?)?;

    let published = date
        .select(&selectors.time)
        .next()
        .and_then(|time| time.value().attr("datetime"))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let photo = message.select(&selectors.photo).next();
    let image_url = photo
        .and_then(|wrap| wrap.value().attr("style"))
        .and_then(background_image_url);

    let mut media = Vec::new();
    if photo.is_some() {
        media.push(MediaKind::Photo);
    }
    if message.select(&selectors.audio).next().is_some() {
        media.push(MediaKind::Audio);
    }
    if message.select(&selectors.video).next().is_some() {
        media.push(MediaKind::Video);
    }
    if message.select(&selectors.document).next().is_some() {
        media.push(MediaKind::Document);
    }

    let links = message
        .select(&selectors.anchor)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect();

    Some(RawItem {
        id,
        body: element_text(text),
        image_url,
        media,
        links,
        published,
    })
}

fn permalink(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with('/') {
        Some(format!("{PERMALINK_HOST}{href}"))
    } else {
        Some(href.to_string())
    }
}

/// Extract the URL from a `background-image:url('…')` style declaration.
fn background_image_url(style: &str) -> Option<String> {
    let start = style.find("background-image")?;
    let rest = &style[start..];
    let open = rest.find("url(")? + "url(".len();
    let rest = &rest[open..];
    let close = rest.find(')')?;
    let url = rest[..close].trim().trim_matches(['\'', '"']);
    (!url.is_empty()).then(|| url.to_string())
}
