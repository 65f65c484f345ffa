use std::sync::Mutex;
use std::time::Duration;

use pretty_assertions::assert_eq;
use relay_engine::{retry, Pause, RetryPolicy};

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

#[derive(Debug, Clone, PartialEq, Eq)]
enum TestError {
    Transient,
    Fatal,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        delay: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn success_on_first_attempt_does_not_pause() {
    let pause = RecordingPause::default();
    let outcome = retry(
        "test",
        policy(),
        &pause,
        |_| async { Ok::<_, TestError>("done") },
        |_| true,
    )
    .await;

    assert_eq!(outcome.result, Ok("done"));
    assert_eq!(outcome.attempts, 1);
    assert!(pause.recorded().is_empty());
}

#[tokio::test]
async fn transient_failures_then_success_pause_between_attempts() {
    let pause = RecordingPause::default();
    let outcome = retry(
        "test",
        policy(),
        &pause,
        |attempt| async move {
            if attempt < 5 {
                Err(TestError::Transient)
            } else {
                Ok(attempt)
            }
        },
        |err| *err == TestError::Transient,
    )
    .await;

    assert_eq!(outcome.result, Ok(5));
    assert_eq!(outcome.attempts, 5);
    assert_eq!(pause.recorded(), vec![Duration::from_secs(5); 4]);
}

#[tokio::test]
async fn terminal_failure_stops_immediately() {
    let pause = RecordingPause::default();
    let calls = Mutex::new(0u32);
    let outcome = retry(
        "test",
        policy(),
        &pause,
        |_| {
            *calls.lock().unwrap() += 1;
            async { Err::<(), _>(TestError::Fatal) }
        },
        |err| *err == TestError::Transient,
    )
    .await;

    assert_eq!(outcome.result, Err(TestError::Fatal));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(*calls.lock().unwrap(), 1);
    assert!(pause.recorded().is_empty());
}

#[tokio::test]
async fn exhaustion_makes_exactly_max_attempts_with_no_trailing_pause() {
    let pause = RecordingPause::default();
    let outcome = retry(
        "test",
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        },
        &pause,
        |_| async { Err::<(), _>(TestError::Transient) },
        |_| true,
    )
    .await;

    assert_eq!(outcome.result, Err(TestError::Transient));
    assert_eq!(outcome.attempts, 3);
    assert_eq!(pause.recorded().len(), 2);
}

#[tokio::test]
async fn zero_attempts_still_calls_once() {
    let pause = RecordingPause::default();
    let outcome = retry(
        "test",
        RetryPolicy {
            max_attempts: 0,
            delay: Duration::from_secs(1),
        },
        &pause,
        |_| async { Err::<(), _>(TestError::Transient) },
        |_| true,
    )
    .await;

    assert_eq!(outcome.attempts, 1);
    assert!(pause.recorded().is_empty());
}
