//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use switchyard_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn from_preset(preset: PresetResponse, delay: Option<Duration>) -> Self {
        let mut has_tool_call = false;
        let mut events: VecDeque<_> = preset
            .events
            .into_iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg)
                }
                PresetEvent::ToolCall(req) => {
                    has_tool_call = true;
                    ModelResponseEvent::ToolCall(req)
                }
            })
            .collect();
        events.push_back(ModelResponseEvent::Completed(if has_tool_call {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        }));
        Self {
            events,
            delay,
            sleep: None,
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        if let Some(delay) = this.delay {
            if this.events.is_empty() {
                return Poll::Ready(Ok(None));
            }
            let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
        }
        Poll::Ready(Ok(this.events.pop_front()))
    }
}

#[derive(Default)]
struct Script {
    responses: VecDeque<PresetResponse>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Responses are scripted up front and handed out in order, one per
/// request. Every request is recorded so tests can inspect exactly what a
/// specialist sent. When the script runs out, requests fail.
///
/// Clones share the same script.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Creates a provider that replies with the given responses in order.
    pub fn with_responses(
        responses: impl IntoIterator<Item = PresetResponse>,
    ) -> Self {
        let provider = Self::default();
        for resp in responses {
            provider.add_response(resp);
        }
        provider
    }

    #[inline]
    pub fn add_response(&self, preset: PresetResponse) {
        self.script().responses.push_back(preset);
    }

    /// Delays every event by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns the requests received so far.
    #[inline]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.script().requests.clone()
    }

    /// Returns the number of scripted responses not consumed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.script().responses.len()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        // A test that panicked while holding the lock already failed.
        self.script.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let mut script = self.script();
        script.requests.push(req.clone());
        let result = match script.responses.pop_front() {
            None => Err(Error {
                message: "script exhausted",
                kind: ErrorKind::Other,
            }),
            Some(PresetResponse {
                failure: Some(failure),
                ..
            }) => Err(Error {
                message: "preset failure",
                kind: failure.kind(),
            }),
            Some(preset) => Ok(TestModelResponse::from_preset(preset, self.delay)),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use switchyard_model::{ModelMessage, ToolCallRequest};

    use super::*;

    async fn collect_response(
        resp: TestModelResponse,
    ) -> (String, Vec<ToolCallRequest>, Option<ModelFinishReason>) {
        let mut resp = pin!(resp);
        let mut msg = String::new();
        let mut tool_calls = vec![];
        let mut finish_reason = None;
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            match event {
                ModelResponseEvent::MessageDelta(delta) => msg.push_str(&delta),
                ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
                ModelResponseEvent::Completed(reason) => {
                    finish_reason = Some(reason)
                }
            }
        }
        (msg, tool_calls, finish_reason)
    }

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::user_text(text)],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_scripted_responses() {
        let mut provider = TestModelProvider::with_responses([
            PresetResponse::with_events([
                PresetEvent::MessageDelta("Hello, ".to_owned()),
                PresetEvent::MessageDelta("world!".to_owned()),
            ]),
            PresetResponse::with_events([PresetEvent::ToolCall(
                ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "run_code".to_owned(),
                    arguments: json!({ "code": "print(1)" }),
                },
            )]),
        ]);
        provider.set_delay(Duration::from_millis(1));

        let resp = provider.send_request(&request("Hi")).await.unwrap();
        let (msg, tool_calls, reason) = collect_response(resp).await;
        assert_eq!(msg, "Hello, world!");
        assert!(tool_calls.is_empty());
        assert_eq!(reason, Some(ModelFinishReason::Stop));

        let resp = provider.send_request(&request("Run it")).await.unwrap();
        let (_, tool_calls, reason) = collect_response(resp).await;
        assert_eq!(tool_calls.len(), 1);
        assert_eq!(tool_calls[0].name, "run_code");
        assert_eq!(reason, Some(ModelFinishReason::ToolCalls));

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages[0].as_user_text(), Some("Run it"));
    }

    #[tokio::test]
    async fn test_failures() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::failing(PresetFailure::RateLimited),
        ]);

        let err = provider.send_request(&request("Hi")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);

        let err = provider.send_request(&request("Hi")).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);
        assert_eq!(provider.remaining(), 0);
    }
}
