use std::sync::Arc;
use std::time::Duration;

use relay_logging::{relay_info, relay_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::retry::{retry, Pause, RetryPolicy};

/// One post for the destination page. The image decides the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishRequest<'a> {
    pub body: &'a str,
    pub image_url: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    /// Id assigned by the destination, when it returned one.
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PublishError {
    pub kind: PublishFailureKind,
    pub message: String,
}

impl PublishError {
    pub fn new(kind: PublishFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Client-side rejections (bad request, auth, permission) are not worth repeating.
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, PublishFailureKind::Rejected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishFailureKind {
    #[error("rejected with http status {0}")]
    Rejected(u16),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("network error")]
    Network,
    #[error("malformed response")]
    MalformedResponse,
}

impl PublishFailureKind {
    pub fn from_status(status: StatusCode) -> Self {
        let code = status.as_u16();
        if status.is_client_error()
            && status != StatusCode::REQUEST_TIMEOUT
            && status != StatusCode::TOO_MANY_REQUESTS
        {
            PublishFailureKind::Rejected(code)
        } else {
            PublishFailureKind::HttpStatus(code)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub attempts: u32,
    pub outcome: Result<PublishedPost, PublishError>,
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// A single call to the destination; no retries at this level.
#[async_trait::async_trait]
pub trait PublishService: Send + Sync {
    async fn submit(&self, request: PublishRequest<'_>) -> Result<PublishedPost, PublishError>;
}

/// Retrying front of a [`PublishService`].
pub struct Publisher {
    service: Arc<dyn PublishService>,
    policy: RetryPolicy,
    pause: Arc<dyn Pause>,
}

impl Publisher {
    pub fn new(service: Arc<dyn PublishService>, policy: RetryPolicy, pause: Arc<dyn Pause>) -> Self {
        Self {
            service,
            policy,
            pause,
        }
    }

    pub async fn publish(&self, body: &str, image_url: Option<&str>) -> PublishResult {
        let request = PublishRequest { body, image_url };
        let service = self.service.as_ref();
        let outcome = retry(
            "publish",
            self.policy,
            self.pause.as_ref(),
            |_| service.submit(request),
            |err: &PublishError| !err.is_terminal(),
        )
        .await;

        if let Err(err) = &outcome.result {
            relay_warn!(
                "stage=publish result=failed attempts={} terminal={} error={}",
                outcome.attempts,
                err.is_terminal(),
                err
            );
        }
        PublishResult {
            attempts: outcome.attempts,
            outcome: outcome.result,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphSettings {
    /// Versioned API root, e.g. `https://graph.facebook.com/v12.0`.
    pub api_base: String,
    pub page_id: String,
    pub access_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct GraphPostResponse {
    id: Option<String>,
    post_id: Option<String>,
}

/// Facebook Graph API page publisher: `/photos` with a caption or `/feed` with a message.
pub struct GraphPublishService {
    client: reqwest::Client,
    settings: GraphSettings,
}

impl GraphPublishService {
    pub fn new(settings: GraphSettings) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| PublishError::new(PublishFailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self, edge: &str) -> String {
        format!(
            "{}/{}/{}",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.page_id,
            edge
        )
    }

    fn form_body(&self, request: &PublishRequest<'_>) -> (String, String) {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        let edge = match request.image_url {
            Some(image_url) => {
                form.append_pair("url", image_url)
                    .append_pair("caption", request.body)
                    .append_pair("published", "true");
                "photos"
            }
            None => {
                form.append_pair("message", request.body);
                "feed"
            }
        };
        form.append_pair("access_token", &self.settings.access_token);
        (self.endpoint(edge), form.finish())
    }
}

#[async_trait::async_trait]
impl PublishService for GraphPublishService {
    async fn submit(&self, request: PublishRequest<'_>) -> Result<PublishedPost, PublishError> {
        let (endpoint, body) = self.form_body(&request);
        let response = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(PublishError::new(
                PublishFailureKind::from_status(status),
                String::from_utf8_lossy(&bytes).chars().take(512).collect::<String>(),
            ));
        }

        let parsed: GraphPostResponse = serde_json::from_slice(&bytes)
            .map_err(|err| PublishError::new(PublishFailureKind::MalformedResponse, err.to_string()))?;
        let post_id = parsed.post_id.or(parsed.id);
        relay_info!(
            "stage=publish edge={} post_id={}",
            if request.image_url.is_some() { "photos" } else { "feed" },
            post_id.as_deref().unwrap_or("-")
        );
        Ok(PublishedPost { post_id })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> PublishError {
    if err.is_timeout() {
        return PublishError::new(PublishFailureKind::Timeout, err.to_string());
    }
    PublishError::new(PublishFailureKind::Network, err.to_string())
}
