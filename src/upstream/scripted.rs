//! Scripted provider.
//!
//! Replays a fixed list of steps instead of calling a model, and records
//! how it was invoked. Stands in for a live provider in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{
    CompletionRequest, Credential, EventStream, TextStreamProvider, UpstreamError, UpstreamEvent,
};

/// One step of a script.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a text delta.
    Text(String),
    /// Emit a non-text event of the given type.
    Event(String),
    /// Fail the stream with the given message.
    Fail(String),
}

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    steps: Vec<ScriptStep>,
    open_error: Option<String>,
    step_delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Convenience: stream the given fragments, then complete.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(fragments.into_iter().map(|f| ScriptStep::Text(f.into())).collect())
    }

    /// Make every `open_stream` call fail before streaming.
    pub fn failing_to_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Sleep between steps.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Number of `open_stream` invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The request passed to the most recent `open_stream` call.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl TextStreamProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn open_stream(
        &self,
        _credential: &Credential,
        request: CompletionRequest,
    ) -> Result<EventStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request);
        }

        if let Some(message) = &self.open_error {
            return Err(UpstreamError::Api(message.clone()));
        }

        let (tx, rx) = mpsc::channel(32);
        let steps = self.steps.clone();
        let delay = self.step_delay;

        tokio::spawn(async move {
            for step in steps {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let item = match step {
                    ScriptStep::Text(text) => Ok(UpstreamEvent::TextDelta(text)),
                    ScriptStep::Event(kind) => Ok(UpstreamEvent::Other(kind)),
                    ScriptStep::Fail(message) => Err(UpstreamError::Stream(message)),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)) as EventStream)
    }
}
