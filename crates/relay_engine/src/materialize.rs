use std::path::PathBuf;
use std::sync::Arc;

use relay_core::{filter_items, resolve, FilterRules};
use relay_logging::{relay_info, relay_warn};

use crate::feed_writer::{FeedError, FeedWriter};
use crate::persist::PersistError;
use crate::source::{SourceError, SourceReader};
use crate::watermark::WatermarkStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializeOutcome {
    Written { count: usize, path: PathBuf },
    NothingNew,
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("source unavailable: {0}")]
    Source(#[from] SourceError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("feed written but watermark not saved: {0}")]
    Watermark(PersistError),
}

/// Turns the new items of a source into a syndication feed file.
pub struct FeedMaterializer {
    source: Arc<dyn SourceReader>,
    writer: FeedWriter,
    watermark: Arc<dyn WatermarkStore>,
    rules: FilterRules,
}

impl FeedMaterializer {
    pub fn new(
        source: Arc<dyn SourceReader>,
        writer: FeedWriter,
        watermark: Arc<dyn WatermarkStore>,
        rules: FilterRules,
    ) -> Self {
        Self {
            source,
            writer,
            watermark,
            rules,
        }
    }

    /// Write the items newer than the watermark, newest first, and move the
    /// watermark to the newest written item once the file is in place.
    pub async fn run_once(&self) -> Result<MaterializeOutcome, MaterializeError> {
        let watermark = self.watermark.load().unwrap_or_else(|err| {
            relay_warn!("stage=watermark action=load error={} fallback=none", err);
            None
        });

        let raw = self.source.read().await?;
        let total = raw.len();
        relay_info!("stage=fetch source={} items={}", self.source.name(), total);

        let candidates = filter_items(raw, &self.rules);
        let change_set = resolve(&candidates, watermark.as_deref());
        relay_info!(
            "stage=resolve candidates={} dropped={} new={} gap_recovery={}",
            candidates.len(),
            total - candidates.len(),
            change_set.len(),
            change_set.gap_recovery
        );
        if change_set.is_empty() {
            return Ok(MaterializeOutcome::NothingNew);
        }

        let mut items = change_set.items;
        items.reverse();
        items.truncate(self.writer.max_items().max(1));

        let path = self.writer.write(&items)?;
        relay_info!("stage=feed path={} items={}", path.display(), items.len());

        if let Some(newest) = items.first() {
            self.watermark
                .store(&newest.id)
                .map_err(MaterializeError::Watermark)?;
            relay_info!("stage=commit id={}", newest.id);
        }

        Ok(MaterializeOutcome::Written {
            count: items.len(),
            path,
        })
    }
}
