use std::process::ExitCode;
use std::sync::Arc;

use relay_core::{HaltReason, RunOutcome, RunReport};
use relay_engine::{
    ChannelPageSource, ConfigError, FeedMaterializer, FeedSource, FeedWriter, FileWatermarkStore,
    GeminiRewriter, GraphPublishService, MaterializeError, MaterializeOutcome, Pause, Publisher, RelayConfig,
    ReqwestFetcher, SourceReader, SyncDriver, TextTransform, TokioPause,
    DEFAULT_CHANNEL_WATERMARK_FILE, DEFAULT_FEED_WATERMARK_FILE,
};
use relay_logging::{relay_error, relay_info};

pub const EXIT_OK: u8 = 0;
pub const EXIT_NOTHING_NEW: u8 = 1;
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 2;
pub const EXIT_HALTED: u8 = 3;
pub const EXIT_CONFIG: u8 = 64;

/// Where the publishing commands read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    ChannelPage,
    Feed,
}

/// Scrape or read the source and publish every new item to the page.
pub async fn publish(config: &RelayConfig, kind: SourceKind) -> ExitCode {
    let driver = match build_driver(config, kind) {
        Ok(driver) => driver,
        Err(err) => return config_failure(&err),
    };
    let report = driver.run_once().await;
    ExitCode::from(publish_exit_code(&report))
}

/// Scrape the channel and write the new items to the RSS file.
pub async fn feed(config: &RelayConfig) -> ExitCode {
    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch_settings()));
    let source: Arc<dyn SourceReader> =
        Arc::new(ChannelPageSource::new(config.channel_url.clone(), fetcher));
    let watermark = Arc::new(FileWatermarkStore::new(
        config.watermark_path_or(DEFAULT_CHANNEL_WATERMARK_FILE),
    ));
    let materializer = FeedMaterializer::new(
        source,
        FeedWriter::new(config.feed_settings()),
        watermark,
        config.filter_rules(),
    );

    let result = materializer.run_once().await;
    match &result {
        Ok(MaterializeOutcome::Written { count, path }) => {
            relay_info!("stage=done feed={} items={}", path.display(), count);
        }
        Ok(MaterializeOutcome::NothingNew) => relay_info!("stage=done feed=unchanged"),
        Err(err) => relay_error!("stage=halt reason=\"{}\"", err),
    }
    ExitCode::from(feed_exit_code(&result))
}

pub fn feed_exit_code(result: &Result<MaterializeOutcome, MaterializeError>) -> u8 {
    match result {
        Ok(MaterializeOutcome::Written { .. }) => EXIT_OK,
        Ok(MaterializeOutcome::NothingNew) => EXIT_NOTHING_NEW,
        Err(MaterializeError::Source(_)) => EXIT_SOURCE_UNAVAILABLE,
        Err(_) => EXIT_HALTED,
    }
}

fn build_driver(config: &RelayConfig, kind: SourceKind) -> Result<SyncDriver, ConfigError> {
    let graph = config.graph_settings()?;
    let pause: Arc<dyn Pause> = Arc::new(TokioPause);
    let fetcher = Arc::new(ReqwestFetcher::new(config.fetch_settings()));

    let (source, default_watermark): (Arc<dyn SourceReader>, &str) = match kind {
        SourceKind::ChannelPage => (
            Arc::new(ChannelPageSource::new(config.channel_url.clone(), fetcher))
                as Arc<dyn SourceReader>,
            DEFAULT_CHANNEL_WATERMARK_FILE,
        ),
        SourceKind::Feed => (
            Arc::new(FeedSource::new(config.feed_url.clone(), fetcher))
                as Arc<dyn SourceReader>,
            DEFAULT_FEED_WATERMARK_FILE,
        ),
    };

    let transform = match config.gemini_settings() {
        Some(settings) => {
            let rewriter = GeminiRewriter::new(settings).map_err(|err| ConfigError::Invalid {
                key: "GEMINI_API_BASE",
                value: String::new(),
                reason: err.to_string(),
            })?;
            TextTransform::with_rewriter(
                Arc::new(rewriter),
                config.transform_policy,
                config.retry,
                pause.clone(),
            )
        }
        None => TextTransform::identity(pause.clone()),
    };

    let service = GraphPublishService::new(graph).map_err(|err| ConfigError::Invalid {
        key: "GRAPH_API_BASE",
        value: config.graph_api_base.clone(),
        reason: err.to_string(),
    })?;
    let publisher = Publisher::new(Arc::new(service), config.retry, pause.clone());
    let watermark = Arc::new(FileWatermarkStore::new(
        config.watermark_path_or(default_watermark),
    ));

    Ok(SyncDriver::new(
        source,
        transform,
        publisher,
        watermark,
        pause,
        config.sync_settings(),
    ))
}

pub fn config_failure(err: &ConfigError) -> ExitCode {
    relay_error!("stage=config error=\"{}\"", err);
    ExitCode::from(EXIT_CONFIG)
}

pub fn publish_exit_code(report: &RunReport) -> u8 {
    match &report.outcome {
        RunOutcome::Completed | RunOutcome::NothingNew => EXIT_OK,
        RunOutcome::Halted(HaltReason::SourceUnavailable { .. }) => EXIT_SOURCE_UNAVAILABLE,
        RunOutcome::Halted(_) => EXIT_HALTED,
    }
}
