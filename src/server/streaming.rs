//! Streaming relay from upstream events to an HTTP response body.
//!
//! Text deltas are forwarded verbatim and in order; every other upstream
//! event is dropped. An optional warm-up fragment goes out first. If the
//! upstream fails mid-stream the headers are already sent, so the relay
//! appends [`STREAM_ERROR_MARKER`] and closes the body instead of failing
//! the response. When the client goes away the upstream stream is dropped,
//! even if it is idle at that moment.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, trace, warn};

use crate::upstream::{EventStream, UpstreamEvent};

/// Appended to the body when the upstream stream fails after output began.
pub const STREAM_ERROR_MARKER: &str = "\n\n**Error in stream processing**";

/// How a relayed stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Upstream finished normally.
    Complete,
    /// Upstream failed; the error marker was written.
    UpstreamFailed,
    /// The client stopped reading.
    ClientGone,
}

/// Forward `events` into a byte stream, prefixed by `warmup` if set.
///
/// The returned stream ends exactly once, after the relay task drops its
/// sender.
pub fn relay_events(
    events: EventStream,
    warmup: Option<String>,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let (tx, rx) = mpsc::channel::<Bytes>(32);

    tokio::spawn(async move {
        let outcome = relay(events, warmup, &tx, &request_id).await;
        info!(request_id = request_id, outcome = ?outcome, "Stream finished");
    });

    ReceiverStream::new(rx).map(Ok::<Bytes, Infallible>)
}

/// Wrap a relayed stream in a 200 response with streaming headers.
pub fn relay_response(events: EventStream, warmup: Option<String>, request_id: String) -> Response {
    let body = Body::from_stream(relay_events(events, warmup, request_id));

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}

async fn relay(
    mut events: EventStream,
    warmup: Option<String>,
    tx: &mpsc::Sender<Bytes>,
    request_id: &str,
) -> RelayOutcome {
    info!(request_id, "Starting stream to client");

    if let Some(warmup) = warmup {
        if tx.send(Bytes::from(warmup)).await.is_err() {
            return RelayOutcome::ClientGone;
        }
    }

    loop {
        // An idle upstream must not keep a departed client's relay alive.
        let event = tokio::select! {
            _ = tx.closed() => {
                warn!(request_id, "Client disconnected mid-stream");
                return RelayOutcome::ClientGone;
            }
            event = events.next() => event,
        };
        let Some(event) = event else {
            break;
        };

        match event {
            Ok(UpstreamEvent::TextDelta(text)) => {
                if text.is_empty() {
                    continue;
                }
                debug!(request_id, chars = text.len(), "Chunk received");
                if tx.send(Bytes::from(text)).await.is_err() {
                    warn!(request_id, "Client disconnected mid-stream");
                    return RelayOutcome::ClientGone;
                }
            }
            Ok(UpstreamEvent::Other(kind)) => {
                trace!(request_id, kind, "Ignoring upstream event");
            }
            Err(e) => {
                error!(request_id, error = %e, "Stream error");
                let _ = tx.send(Bytes::from_static(STREAM_ERROR_MARKER.as_bytes())).await;
                return RelayOutcome::UpstreamFailed;
            }
        }
    }

    RelayOutcome::Complete
}
