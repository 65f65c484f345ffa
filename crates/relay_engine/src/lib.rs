//! Relay engine: IO around the pure sync machine.
mod config;
mod decode;
mod driver;
mod feed_writer;
mod fetch;
mod materialize;
mod persist;
mod publish;
mod retry;
pub mod source;
mod transform;
mod watermark;

pub use config::{
    ConfigError, PageCredentials, RelayConfig, RewriteConfig, DEFAULT_CHANNEL_WATERMARK_FILE,
    DEFAULT_FEED_WATERMARK_FILE,
};
pub use decode::{decode_document, DecodeError, DecodedText};
pub use driver::SyncDriver;
pub use feed_writer::{FeedError, FeedSettings, FeedWriter};
pub use fetch::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, FetchSettings, Fetcher, ReqwestFetcher,
};
pub use materialize::{FeedMaterializer, MaterializeError, MaterializeOutcome};
pub use persist::{ensure_dir, write_atomic, PersistError};
pub use publish::{
    GraphPublishService, GraphSettings, PublishError, PublishFailureKind, PublishRequest,
    PublishResult, PublishService, PublishedPost, Publisher,
};
pub use retry::{retry, Pause, RetryOutcome, RetryPolicy, TokioPause};
pub use source::{ChannelPageSource, FeedSource, SourceError, SourceReader};
pub use transform::{
    GeminiRewriter, GeminiSettings, RewriteService, TextTransform, TransformError,
    TransformPolicy, REWRITE_INSTRUCTION,
};
pub use watermark::{FileWatermarkStore, WatermarkStore};
