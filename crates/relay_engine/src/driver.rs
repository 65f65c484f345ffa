use std::collections::VecDeque;
use std::sync::Arc;

use relay_core::{update, Effect, Msg, RunReport, RunState, SyncSettings};
use relay_logging::{relay_error, relay_info, relay_warn};

use crate::publish::Publisher;
use crate::retry::Pause;
use crate::source::SourceReader;
use crate::transform::TextTransform;
use crate::watermark::WatermarkStore;

/// Executes the effects of one sync pass against real or fake collaborators.
pub struct SyncDriver {
    source: Arc<dyn SourceReader>,
    transform: TextTransform,
    publisher: Publisher,
    watermark: Arc<dyn WatermarkStore>,
    pause: Arc<dyn Pause>,
    settings: SyncSettings,
}

impl SyncDriver {
    pub fn new(
        source: Arc<dyn SourceReader>,
        transform: TextTransform,
        publisher: Publisher,
        watermark: Arc<dyn WatermarkStore>,
        pause: Arc<dyn Pause>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            transform,
            publisher,
            watermark,
            pause,
            settings,
        }
    }

    /// One complete pass: fetch, filter, resolve, then publish and commit each
    /// new item in order. Stops at the first failure.
    pub async fn run_once(&self) -> RunReport {
        let watermark = match self.watermark.load() {
            Ok(value) => value,
            Err(err) => {
                relay_warn!("stage=watermark action=load error={} fallback=none", err);
                None
            }
        };
        relay_info!(
            "stage=start source={} watermark={}",
            self.source.name(),
            watermark.as_deref().unwrap_or("-")
        );

        let (mut state, effects) = RunState::start(watermark, self.settings.clone());
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let Some(msg) = self.execute(effect).await else {
                continue;
            };
            let fetched = matches!(msg, Msg::SourceFetched(_));
            let (next, effects) = update(state, msg);
            state = next;
            if fetched {
                log_resolution(&state);
            }
            queue.extend(effects);
        }

        let report = state.report();
        log_report(&report, &state);
        report
    }

    async fn execute(&self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::FetchSource => Some(match self.source.read().await {
                Ok(items) => {
                    relay_info!("stage=fetch source={} items={}", self.source.name(), items.len());
                    Msg::SourceFetched(items)
                }
                Err(err) => Msg::SourceFailed(err.to_string()),
            }),
            Effect::Transform { id, body } => Some(match self.transform.transform(&body).await {
                Ok(body) => Msg::ItemTransformed { id, body },
                Err(err) => Msg::TransformFailed {
                    id,
                    message: err.to_string(),
                },
            }),
            Effect::Publish {
                id,
                body,
                image_url,
            } => {
                let result = self.publisher.publish(&body, image_url.as_deref()).await;
                let attempts = result.attempts;
                Some(match result.outcome {
                    Ok(post) => {
                        relay_info!(
                            "stage=publish id={} attempts={} post_id={}",
                            id,
                            attempts,
                            post.post_id.as_deref().unwrap_or("-")
                        );
                        Msg::ItemPublished { id, attempts }
                    }
                    Err(err) => Msg::PublishFailed {
                        id,
                        attempts,
                        terminal: err.is_terminal(),
                        message: err.to_string(),
                    },
                })
            }
            Effect::CommitWatermark { id } => Some(match self.watermark.store(&id) {
                Ok(()) => {
                    relay_info!("stage=commit id={}", id);
                    Msg::WatermarkCommitted { id }
                }
                Err(err) => Msg::WatermarkFailed {
                    id,
                    message: err.to_string(),
                },
            }),
            Effect::Cooldown(duration) => {
                self.pause.pause(duration).await;
                None
            }
        }
    }
}

fn log_resolution(state: &RunState) {
    let in_flight = usize::from(state.current().is_some());
    relay_info!(
        "stage=resolve candidates={} dropped={} new={} gap_recovery={}",
        state.candidates(),
        state.dropped(),
        state.pending_len() + in_flight,
        state.gap_recovery()
    );
    if state.gap_recovery() {
        relay_warn!(
            "stage=resolve watermark={} not found in source; publishing every candidate",
            state.watermark().unwrap_or("-")
        );
    }
}

fn log_report(report: &RunReport, state: &RunState) {
    match state.halt_reason() {
        Some(reason) => relay_error!(
            "stage=halt reason=\"{}\" published={}",
            reason,
            report.published.len()
        ),
        None => relay_info!(
            "stage=done published={} candidates={} dropped={} gap_recovery={}",
            report.published.len(),
            report.candidates,
            report.dropped,
            report.gap_recovery
        ),
    }
}
