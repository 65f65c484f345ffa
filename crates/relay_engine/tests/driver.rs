use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_core::{HaltReason, RawItem, RunOutcome, SyncSettings};
use relay_engine::{
    FetchError, FailureKind, Pause, PersistError, PublishError, PublishFailureKind,
    PublishRequest, PublishService, PublishedPost, Publisher, RetryPolicy, RewriteService,
    SourceError, SourceReader, SyncDriver, TextTransform, TransformError, TransformPolicy,
    WatermarkStore,
};

struct FakeSource {
    snapshot: Mutex<Result<Vec<RawItem>, String>>,
}

impl FakeSource {
    fn new(items: Vec<RawItem>) -> Self {
        Self {
            snapshot: Mutex::new(Ok(items)),
        }
    }

    fn unreachable() -> Self {
        Self {
            snapshot: Mutex::new(Err("connection refused".to_string())),
        }
    }

    fn replace(&self, items: Vec<RawItem>) {
        *self.snapshot.lock().unwrap() = Ok(items);
    }
}

#[async_trait::async_trait]
impl SourceReader for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn read(&self) -> Result<Vec<RawItem>, SourceError> {
        self.snapshot.lock().unwrap().clone().map_err(|message| {
            SourceError::Fetch(FetchError {
                kind: FailureKind::Network,
                message,
            })
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Submission {
    body: String,
    image_url: Option<String>,
}

/// Plays back scripted responses; succeeds once the script runs out.
#[derive(Default)]
struct ScriptedService {
    script: Mutex<VecDeque<Result<(), PublishFailureKind>>>,
    submissions: Mutex<Vec<Submission>>,
}

impl ScriptedService {
    fn with_script(script: Vec<Result<(), PublishFailureKind>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PublishService for ScriptedService {
    async fn submit(&self, request: PublishRequest<'_>) -> Result<PublishedPost, PublishError> {
        self.submissions.lock().unwrap().push(Submission {
            body: request.body.to_string(),
            image_url: request.image_url.map(str::to_string),
        });
        match self.script.lock().unwrap().pop_front() {
            Some(Err(kind)) => Err(PublishError::new(kind, "scripted failure")),
            _ => Ok(PublishedPost {
                post_id: Some("page_1".to_string()),
            }),
        }
    }
}

#[derive(Default)]
struct MemoryWatermark {
    value: Mutex<Option<String>>,
    writes: Mutex<Vec<String>>,
    fail_writes: bool,
    fail_reads: bool,
}

impl MemoryWatermark {
    fn with_value(value: &str) -> Self {
        Self {
            value: Mutex::new(Some(value.to_string())),
            ..Self::default()
        }
    }

    fn value(&self) -> Option<String> {
        self.value.lock().unwrap().clone()
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl WatermarkStore for MemoryWatermark {
    fn load(&self) -> Result<Option<String>, PersistError> {
        if self.fail_reads {
            return Err(PersistError::Io(std::io::Error::other("unreadable")));
        }
        Ok(self.value())
    }

    fn store(&self, id: &str) -> Result<(), PersistError> {
        if self.fail_writes {
            return Err(PersistError::Io(std::io::Error::other("read-only")));
        }
        self.writes.lock().unwrap().push(id.to_string());
        *self.value.lock().unwrap() = Some(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPause {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    fn recorded(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

struct BrokenRewriter;

#[async_trait::async_trait]
impl RewriteService for BrokenRewriter {
    async fn rewrite(&self, _body: &str) -> Result<String, TransformError> {
        Err(TransformError::Empty)
    }
}

const COOLDOWN: Duration = Duration::from_secs(10);
const RETRY_DELAY: Duration = Duration::from_secs(5);

fn item(id: &str) -> RawItem {
    RawItem {
        id: id.to_string(),
        body: format!("{id} {}", "word ".repeat(45)),
        ..RawItem::default()
    }
}

fn items(ids: &[&str]) -> Vec<RawItem> {
    ids.iter().map(|id| item(id)).collect()
}

struct Harness {
    source: Arc<FakeSource>,
    service: Arc<ScriptedService>,
    watermark: Arc<MemoryWatermark>,
    pause: Arc<RecordingPause>,
    driver: SyncDriver,
}

fn harness_with(
    source: FakeSource,
    service: ScriptedService,
    watermark: MemoryWatermark,
    transform: Option<TransformPolicy>,
) -> Harness {
    let source = Arc::new(source);
    let service = Arc::new(service);
    let watermark = Arc::new(watermark);
    let pause = Arc::new(RecordingPause::default());
    let retry = RetryPolicy {
        max_attempts: 5,
        delay: RETRY_DELAY,
    };
    let transform = match transform {
        Some(policy) => {
            TextTransform::with_rewriter(Arc::new(BrokenRewriter), policy, retry, pause.clone())
        }
        None => TextTransform::identity(pause.clone()),
    };
    let driver = SyncDriver::new(
        source.clone(),
        transform,
        Publisher::new(service.clone(), retry, pause.clone()),
        watermark.clone(),
        pause.clone(),
        SyncSettings {
            cooldown: COOLDOWN,
            ..SyncSettings::default()
        },
    );
    Harness {
        source,
        service,
        watermark,
        pause,
        driver,
    }
}

fn harness(source: FakeSource, watermark: MemoryWatermark) -> Harness {
    harness_with(source, ScriptedService::default(), watermark, None)
}

#[tokio::test]
async fn first_run_publishes_only_the_newest_then_tracks_new_items() {
    relay_logging::initialize_for_tests();
    let h = harness(FakeSource::new(items(&["A", "B", "C"])), MemoryWatermark::default());

    let report = h.driver.run_once().await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.published, vec!["A".to_string()]);
    assert_eq!(h.watermark.value().as_deref(), Some("A"));
    assert!(h.pause.recorded().is_empty());

    h.source.replace(items(&["D", "A", "B", "C"]));
    let report = h.driver.run_once().await;
    assert_eq!(report.published, vec!["D".to_string()]);
    assert_eq!(h.watermark.writes(), vec!["A".to_string(), "D".to_string()]);
    assert_eq!(h.service.submissions().len(), 2);
}

#[tokio::test]
async fn unchanged_source_is_a_no_op() {
    let h = harness(FakeSource::new(items(&["A", "B"])), MemoryWatermark::with_value("A"));

    let report = h.driver.run_once().await;
    assert_eq!(report.outcome, RunOutcome::NothingNew);
    assert!(h.service.submissions().is_empty());
    assert!(h.watermark.writes().is_empty());
}

#[tokio::test]
async fn new_items_are_published_oldest_first_with_cooldowns_between() {
    let h = harness(
        FakeSource::new(items(&["E", "D", "C", "B", "A"])),
        MemoryWatermark::with_value("B"),
    );

    let report = h.driver.run_once().await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(
        h.watermark.writes(),
        vec!["C".to_string(), "D".to_string(), "E".to_string()]
    );
    assert_eq!(h.pause.recorded(), vec![COOLDOWN, COOLDOWN]);
    assert!(!report.gap_recovery);
}

#[tokio::test]
async fn lost_watermark_publishes_every_candidate() {
    let h = harness(
        FakeSource::new(items(&["V5", "V4", "V3", "V2", "V1"])),
        MemoryWatermark::with_value("gone"),
    );

    let report = h.driver.run_once().await;
    assert!(report.gap_recovery);
    assert_eq!(
        h.watermark.writes(),
        vec!["V1", "V2", "V3", "V4", "V5"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
    assert_eq!(h.pause.recorded(), vec![COOLDOWN; 4]);
}

#[tokio::test]
async fn unreadable_watermark_is_treated_as_first_run() {
    let watermark = MemoryWatermark {
        fail_reads: true,
        ..MemoryWatermark::default()
    };
    let h = harness(FakeSource::new(items(&["B", "A"])), watermark);

    let report = h.driver.run_once().await;
    assert_eq!(report.published, vec!["B".to_string()]);
}

#[tokio::test]
async fn unreachable_source_halts_without_touching_the_watermark() {
    let h = harness(FakeSource::unreachable(), MemoryWatermark::with_value("A"));

    let report = h.driver.run_once().await;
    assert!(matches!(
        report.outcome,
        RunOutcome::Halted(HaltReason::SourceUnavailable { .. })
    ));
    assert!(h.watermark.writes().is_empty());
    assert!(h.service.submissions().is_empty());
}

#[tokio::test]
async fn terminal_publish_failure_halts_after_one_attempt() {
    let h = harness_with(
        FakeSource::new(items(&["C", "B", "A"])),
        ScriptedService::with_script(vec![Err(PublishFailureKind::Rejected(400))]),
        MemoryWatermark::with_value("A"),
        None,
    );

    let report = h.driver.run_once().await;
    match report.outcome {
        RunOutcome::Halted(HaltReason::PublishTerminal { id, attempts, .. }) => {
            assert_eq!(id, "B");
            assert_eq!(attempts, 1);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(h.service.submissions().len(), 1);
    assert_eq!(h.watermark.value().as_deref(), Some("A"));
    assert!(h.pause.recorded().is_empty());
}

#[tokio::test]
async fn transient_failures_are_retried_before_publishing() {
    let h = harness_with(
        FakeSource::new(items(&["B", "A"])),
        ScriptedService::with_script(vec![
            Err(PublishFailureKind::HttpStatus(500)),
            Err(PublishFailureKind::Timeout),
            Err(PublishFailureKind::Network),
            Err(PublishFailureKind::HttpStatus(503)),
        ]),
        MemoryWatermark::with_value("A"),
        None,
    );

    let report = h.driver.run_once().await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(h.service.submissions().len(), 5);
    assert_eq!(h.pause.recorded(), vec![RETRY_DELAY; 4]);
    assert_eq!(h.watermark.value().as_deref(), Some("B"));
}

#[tokio::test]
async fn exhausted_retries_halt_and_keep_the_last_good_watermark() {
    let h = harness_with(
        FakeSource::new(items(&["C", "B", "A"])),
        ScriptedService::with_script(vec![
            Ok(()),
            Err(PublishFailureKind::HttpStatus(500)),
            Err(PublishFailureKind::HttpStatus(500)),
            Err(PublishFailureKind::HttpStatus(500)),
            Err(PublishFailureKind::HttpStatus(500)),
            Err(PublishFailureKind::HttpStatus(500)),
        ]),
        MemoryWatermark::with_value("A"),
        None,
    );

    let report = h.driver.run_once().await;
    assert!(matches!(
        report.outcome,
        RunOutcome::Halted(HaltReason::PublishExhausted { attempts: 5, .. })
    ));
    assert_eq!(report.published, vec!["B".to_string()]);
    assert_eq!(h.watermark.value().as_deref(), Some("B"));
}

#[tokio::test]
async fn watermark_write_failure_halts_the_run() {
    let watermark = MemoryWatermark {
        value: Mutex::new(Some("A".to_string())),
        fail_writes: true,
        ..MemoryWatermark::default()
    };
    let h = harness(FakeSource::new(items(&["C", "B", "A"])), watermark);

    let report = h.driver.run_once().await;
    assert!(matches!(
        report.outcome,
        RunOutcome::Halted(HaltReason::PersistenceFailure { .. })
    ));
    // Published once, then stopped before the next item.
    assert_eq!(h.service.submissions().len(), 1);
}

#[tokio::test]
async fn abort_policy_skips_publishing_when_rewrite_fails() {
    let h = harness_with(
        FakeSource::new(items(&["B", "A"])),
        ScriptedService::default(),
        MemoryWatermark::with_value("A"),
        Some(TransformPolicy::AbortItem),
    );

    let report = h.driver.run_once().await;
    assert!(matches!(
        report.outcome,
        RunOutcome::Halted(HaltReason::TransformFailure { .. })
    ));
    assert!(h.service.submissions().is_empty());
    assert_eq!(h.watermark.value().as_deref(), Some("A"));
}

#[tokio::test]
async fn passthrough_policy_publishes_the_reformatted_body() {
    let h = harness_with(
        FakeSource::new(items(&["B", "A"])),
        ScriptedService::default(),
        MemoryWatermark::with_value("A"),
        Some(TransformPolicy::Passthrough),
    );

    let report = h.driver.run_once().await;
    assert_eq!(report.outcome, RunOutcome::Completed);
    let submissions = h.service.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].body.starts_with("B word"));
}

#[tokio::test]
async fn image_items_are_submitted_with_their_image() {
    let mut snapshot = items(&["B", "A"]);
    snapshot[0].image_url = Some("https://cdn.example/b.jpg".to_string());
    let h = harness(FakeSource::new(snapshot), MemoryWatermark::with_value("A"));

    h.driver.run_once().await;
    assert_eq!(
        h.service.submissions()[0].image_url.as_deref(),
        Some("https://cdn.example/b.jpg")
    );
}
