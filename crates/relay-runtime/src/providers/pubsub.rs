//! Google Cloud Pub/Sub publisher over the REST API.
//!
//! Publishes through `POST /v1/projects/{project}/topics/{topic}:publish`.
//! The call returns only after Pub/Sub has durably stored the message and
//! assigned it an id, which is the acknowledgement the ingress waits on.
//!
//! When an emulator host is configured the publisher talks plain HTTP to
//! the emulator and sends no credentials.

use crate::auth::AccessTokenProvider;
use crate::client::RelayPublisher;
use crate::error::{AuthError, RelayError};
use crate::message::{MessageId, RelayMessage, TopicPath};
use crate::provider::{ProviderType, PubSubConfig};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[cfg(test)]
#[path = "pubsub_tests.rs"]
mod tests;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    messages: Vec<OutboundMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    data: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    attributes: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Standard Google API error body
#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

// ============================================================================
// Publisher
// ============================================================================

/// Pub/Sub topic publisher
pub struct PubSubPublisher {
    http: reqwest::Client,
    topic: TopicPath,
    publish_url: String,
    tokens: Option<Arc<dyn AccessTokenProvider>>,
}

impl PubSubPublisher {
    /// Create a publisher for the configured topic
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] for an invalid topic and
    /// [`RelayError::Configuration`] for an unusable endpoint.
    pub fn new(
        http: reqwest::Client,
        config: &PubSubConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, RelayError> {
        let topic = config.topic()?;
        let base_url = config.base_url()?;
        let publish_url = format!(
            "{}/v1/{}:publish",
            base_url.as_str().trim_end_matches('/'),
            topic.resource_name()
        );

        let tokens = if config.uses_emulator() {
            debug!(url = %publish_url, "Pub/Sub emulator configured; credentials disabled");
            None
        } else {
            Some(tokens)
        };

        Ok(Self {
            http,
            topic,
            publish_url,
            tokens,
        })
    }

    pub fn topic(&self) -> &TopicPath {
        &self.topic
    }

    /// Translate a non-success HTTP response into a relay error
    fn classify_failure(&self, status: StatusCode, body: &str) -> RelayError {
        let (code, message) = match serde_json::from_str::<GoogleErrorBody>(body) {
            Ok(parsed) => (parsed.error.status, parsed.error.message),
            Err(_) => (String::new(), body.to_string()),
        };
        let code = if code.is_empty() {
            status.as_u16().to_string()
        } else {
            code
        };

        match status {
            StatusCode::NOT_FOUND => RelayError::TopicNotFound {
                topic: self.topic.resource_name(),
            },
            StatusCode::UNAUTHORIZED => RelayError::Authentication(AuthError::Rejected { message }),
            StatusCode::FORBIDDEN => RelayError::PermissionDenied {
                topic: self.topic.resource_name(),
            },
            _ => RelayError::ProviderError {
                provider: ProviderType::PubSub.to_string(),
                code,
                message,
            },
        }
    }
}

#[async_trait]
impl RelayPublisher for PubSubPublisher {
    #[instrument(skip(self, message), fields(topic = %self.topic, size = message.size()))]
    async fn publish(&self, message: RelayMessage) -> Result<MessageId, RelayError> {
        let max_size = ProviderType::PubSub.max_message_size();
        if message.size() > max_size {
            return Err(RelayError::MessageTooLarge {
                size: message.size(),
                max_size,
            });
        }

        let body = PublishRequest {
            messages: vec![OutboundMessage {
                data: general_purpose::STANDARD.encode(&message.body),
                attributes: &message.attributes,
            }],
        };

        let mut request = self.http.post(&self.publish_url).json(&body);
        if let Some(tokens) = &self.tokens {
            let token = tokens.access_token().await?;
            request = request.bearer_auth(token.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| RelayError::ConnectionFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = self.classify_failure(status, &text);
            warn!(status = %status, error = %error, "Pub/Sub publish rejected");
            return Err(error);
        }

        let parsed: PublishResponse =
            response
                .json()
                .await
                .map_err(|e| RelayError::NotAcknowledged {
                    message: format!("unreadable publish response: {}", e),
                })?;

        let raw_id = parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::NotAcknowledged {
                message: "publish response carried no message id".to_string(),
            })?;

        let message_id: MessageId = raw_id.parse()?;
        debug!(message_id = %message_id, "Pub/Sub acknowledged message");
        Ok(message_id)
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::PubSub
    }

    fn destination(&self) -> String {
        self.topic.resource_name()
    }
}
