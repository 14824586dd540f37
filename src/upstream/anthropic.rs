//! Anthropic Messages API provider.
//!
//! Opens `POST /v1/messages` with `stream: true` and turns the SSE response
//! into [`UpstreamEvent`]s. Only `content_block_delta` events with a
//! `text_delta` payload carry text; an `error` event ends the stream with
//! [`UpstreamError::Api`].

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::sse::SseParser;
use super::{
    CompletionRequest, Credential, EventStream, TextStreamProvider, UpstreamError, UpstreamEvent,
};
use crate::config::UpstreamConfig;

const MESSAGES_PATH: &str = "/v1/messages";

/// Messages API request payload.
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Subset of a streamed event that the relay cares about.
#[derive(Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Decode one SSE `data:` payload.
pub fn decode_event(data: &str) -> Result<UpstreamEvent, UpstreamError> {
    let payload: StreamPayload = serde_json::from_str(data)?;

    match payload.kind.as_str() {
        "content_block_delta" => match payload.delta {
            Some(Delta {
                kind: Some(kind),
                text,
            }) if kind == "text_delta" => Ok(UpstreamEvent::TextDelta(text.unwrap_or_default())),
            _ => Ok(UpstreamEvent::Other(payload.kind)),
        },
        "error" => {
            let error = payload.error.unwrap_or(ApiErrorBody {
                kind: None,
                message: None,
            });
            Err(UpstreamError::Api(format!(
                "{}: {}",
                error.kind.as_deref().unwrap_or("error"),
                error.message.as_deref().unwrap_or("no message")
            )))
        }
        _ => Ok(UpstreamEvent::Other(payload.kind)),
    }
}

/// A [`TextStreamProvider`] backed by the Anthropic Messages API.
///
/// **Base URL**: defaults to `https://api.anthropic.com`; any server speaking
/// the same streaming protocol can be targeted through configuration.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: reqwest::Client,
    url: String,
    api_version: String,
}

impl AnthropicProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_version: impl Into<String>) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), MESSAGES_PATH),
            api_version: api_version.into(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(reqwest::Client::new(), &config.base_url, config.api_version.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TextStreamProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn open_stream(
        &self,
        credential: &Credential,
        request: CompletionRequest,
    ) -> Result<EventStream, UpstreamError> {
        let body = ApiRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            messages: vec![ApiMessage {
                role: "user",
                content: &request.prompt,
            }],
            stream: true,
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", credential.expose())
            .header("anthropic-version", &self.api_version)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Messages API rejected the request");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(model = request.model, "Messages API stream opened");

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(pump_events(response, tx));

        Ok(Box::pin(ReceiverStream::new(rx)) as EventStream)
    }
}

/// Read the SSE body and forward decoded events until the body ends, an
/// error occurs, or the receiver is dropped.
async fn pump_events(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<UpstreamEvent, UpstreamError>>,
) {
    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(UpstreamError::Request(e))).await;
                return;
            }
        };

        for message in parser.push(&chunk) {
            let event = message.and_then(|m| decode_event(&m.data));
            let failed = event.is_err();
            if tx.send(event).await.is_err() || failed {
                return;
            }
        }
    }

    if let Some(message) = parser.finish() {
        let _ = tx.send(decode_event(&message.data)).await;
    }
}
