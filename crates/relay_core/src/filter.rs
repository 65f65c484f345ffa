use crate::{CandidateItem, MediaKind, RawItem};

/// Glyph the channel uses to mark posts that only point at the next post.
pub const SKIP_MARKER: char = '👇';

/// Minimum word count for a post to count as meaningful text.
pub const MIN_WORDS: usize = 40;

pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    "mp3", "ogg", "wav", "mp4", "mov", "avi", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "zip", "rar",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRules {
    pub skip_marker: char,
    pub min_words: usize,
    /// Lowercase extensions without the leading dot.
    pub excluded_extensions: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            skip_marker: SKIP_MARKER,
            min_words: MIN_WORDS,
            excluded_extensions: EXCLUDED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    SkipMarker,
    Media(MediaKind),
    ExcludedLink(String),
    TooShort { words: usize },
}

/// Keep the items that pass every rule, preserving source order.
pub fn filter_items(raw: Vec<RawItem>, rules: &FilterRules) -> Vec<CandidateItem> {
    raw.into_iter()
        .filter(|item| check_item(item, rules).is_ok())
        .map(|item| CandidateItem {
            body: normalize_whitespace(&item.body),
            id: item.id,
            image_url: item.image_url,
            published: item.published,
        })
        .collect()
}

pub fn check_item(item: &RawItem, rules: &FilterRules) -> Result<(), Rejection> {
    if item.body.contains(rules.skip_marker) {
        return Err(Rejection::SkipMarker);
    }
    if let Some(kind) = item
        .media
        .iter()
        .copied()
        .find(|kind| matches!(kind, MediaKind::Audio | MediaKind::Video))
    {
        return Err(Rejection::Media(kind));
    }
    if let Some(href) = item
        .links
        .iter()
        .find(|href| has_excluded_extension(href, &rules.excluded_extensions))
    {
        return Err(Rejection::ExcludedLink(href.clone()));
    }
    let words = word_count(&normalize_whitespace(&item.body));
    if words < rules.min_words {
        return Err(Rejection::TooShort { words });
    }
    Ok(())
}

fn has_excluded_extension(href: &str, extensions: &[String]) -> bool {
    let path = href
        .split(['?', '#'])
        .next()
        .unwrap_or(href)
        .to_lowercase();
    extensions.iter().any(|ext| {
        path.strip_suffix(ext.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// Collapse whitespace runs inside each line, trim lines and drop blank ones.
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
