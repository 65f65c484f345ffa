use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use relay_logging::{relay_info, relay_warn};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;

use crate::retry::{retry, Pause, RetryPolicy};

/// What to do when the rewrite service keeps failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformPolicy {
    /// Publish the input text unchanged.
    Passthrough,
    /// Do not publish the item and halt the run.
    AbortItem,
}

impl FromStr for TransformPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "passthrough" | "pass_through" => Ok(TransformPolicy::Passthrough),
            "abort_item" | "abort" => Ok(TransformPolicy::AbortItem),
            other => Err(format!("unknown transform failure policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("rewrite request failed: {0}")]
    Request(String),
    #[error("rewrite service returned http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("rewrite response was malformed: {0}")]
    Malformed(String),
    #[error("rewrite response was empty")]
    Empty,
    #[error("rewrite gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: Box<TransformError> },
}

/// A single call to the text-generation service.
#[async_trait::async_trait]
pub trait RewriteService: Send + Sync {
    async fn rewrite(&self, body: &str) -> Result<String, TransformError>;
}

/// Optional rewrite stage with bounded retries and a failure policy.
pub struct TextTransform {
    rewriter: Option<Arc<dyn RewriteService>>,
    policy: TransformPolicy,
    retry: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl TextTransform {
    /// Stage that returns its input unchanged.
    pub fn identity(pause: Arc<dyn Pause>) -> Self {
        Self {
            rewriter: None,
            policy: TransformPolicy::Passthrough,
            retry: RetryPolicy::default(),
            pause,
        }
    }

    pub fn with_rewriter(
        rewriter: Arc<dyn RewriteService>,
        policy: TransformPolicy,
        retry: RetryPolicy,
        pause: Arc<dyn Pause>,
    ) -> Self {
        Self {
            rewriter: Some(rewriter),
            policy,
            retry,
            pause,
        }
    }

    pub fn policy(&self) -> TransformPolicy {
        self.policy
    }

    pub async fn transform(&self, body: &str) -> Result<String, TransformError> {
        let Some(rewriter) = self.rewriter.as_deref() else {
            return Ok(body.to_string());
        };

        let outcome = retry(
            "rewrite",
            self.retry,
            self.pause.as_ref(),
            |_| rewriter.rewrite(body),
            |_: &TransformError| true,
        )
        .await;

        match outcome.result {
            Ok(text) => {
                relay_info!(
                    "stage=transform result=rewritten attempts={} chars={}",
                    outcome.attempts,
                    text.chars().count()
                );
                Ok(text)
            }
            Err(last) => match self.policy {
                TransformPolicy::Passthrough => {
                    relay_warn!(
                        "stage=transform result=passthrough attempts={} error={}",
                        outcome.attempts,
                        last
                    );
                    Ok(body.to_string())
                }
                TransformPolicy::AbortItem => Err(TransformError::Exhausted {
                    attempts: outcome.attempts,
                    last: Box::new(last),
                }),
            },
        }
    }
}

pub const REWRITE_INSTRUCTION: &str = "أعد صياغة النص التالي بأسلوب منظم ومقسم إلى فقرات قصيرة واضحة، \
مع الحفاظ الكامل على المعنى وعدم إضافة أي معلومات جديدة. اكتب الناتج باللغة العربية فقط، \
وأعد النص المعاد صياغته فقط دون أي مقدمة أو تعليق.";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Rewrites through the Gemini `generateContent` endpoint.
pub struct GeminiRewriter {
    client: reqwest::Client,
    settings: GeminiSettings,
}

impl GeminiRewriter {
    pub fn new(settings: GeminiSettings) -> Result<Self, TransformError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| TransformError::Request(err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.model
        )
    }
}

#[async_trait::async_trait]
impl RewriteService for GeminiRewriter {
    async fn rewrite(&self, body: &str) -> Result<String, TransformError> {
        let payload = json!({
            "contents": [{
                "parts": [{ "text": format!("{REWRITE_INSTRUCTION}\n\n{body}") }]
            }]
        });
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.settings.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|err| TransformError::Request(err.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TransformError::Request(err.to_string()))?;
        if !status.is_success() {
            return Err(TransformError::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).chars().take(512).collect(),
            });
        }

        let parsed: GenerateResponse = serde_json::from_slice(&bytes)
            .map_err(|err| TransformError::Malformed(err.to_string()))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(TransformError::Empty);
        }
        Ok(text.to_string())
    }
}
