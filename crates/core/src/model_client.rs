use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use switchyard_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

/// Receives streamed assistant text as it arrives.
pub type TranscriptSink = Arc<dyn Fn(&str) + Send + Sync>;

type ProviderError = Box<dyn ModelProviderError>;
type Exchange = Pin<
    Box<dyn Future<Output = Result<ModelClientResponse, ProviderError>> + Send>,
>;
type ExchangeFn =
    Arc<dyn Fn(ModelRequest, Option<TranscriptSink>) -> Exchange + Send + Sync>;

/// A type-erased model provider that drains a streamed response into a
/// [`ModelClientResponse`].
#[derive(Clone)]
pub(crate) struct ModelClient {
    exchange: ExchangeFn,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let exchange: ExchangeFn = Arc::new(move |req, sink| {
            let span = debug_span!("model request", messages = req.messages.len());
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("sending {req:?}");
                    let resp = fut.await.map_err(|err| {
                        error!("request failed: {err}");
                        Box::new(err) as ProviderError
                    })?;
                    drain::<P::Response>(resp, sink).await
                }
                .instrument(span),
            )
        });
        Self { exchange }
    }

    /// Sends a request and waits for the complete response.
    ///
    /// Dropping the returned future stops reading the response.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        sink: Option<TranscriptSink>,
    ) -> Result<ModelClientResponse, ProviderError> {
        (self.exchange)(req, sink).await
    }
}

/// A completely received model response.
#[derive(Clone, Debug, Default)]
pub(crate) struct ModelClientResponse {
    /// All message deltas joined.
    pub transcript: String,
    /// The provider's own form of the message, if it has one.
    pub opaque_msg: Option<OpaqueMessage>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub finish_reason: Option<ModelFinishReason>,
}

impl ModelClientResponse {
    fn record(&mut self, event: ModelResponseEvent, sink: Option<&TranscriptSink>) {
        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                if let Some(sink) = sink {
                    sink(&delta);
                }
                self.transcript.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(call) => self.tool_calls.push(call),
            ModelResponseEvent::Completed(reason) => {
                self.finish_reason = Some(reason)
            }
        }
    }
}

async fn drain<R: ModelResponse>(
    resp: R,
    sink: Option<TranscriptSink>,
) -> Result<ModelClientResponse, ProviderError> {
    let mut resp = pin!(resp);
    let mut collected = ModelClientResponse::default();
    loop {
        let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .map_err(|err| {
                error!("response failed: {err}");
                Box::new(err) as ProviderError
            })?;
        let Some(event) = event else {
            break;
        };
        trace!("got {event:?}");
        collected.record(event, sink.as_ref());
    }
    collected.opaque_msg = resp.make_opaque_message();
    trace!(
        "response finished with {} tool call(s)",
        collected.tool_calls.len()
    );
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use switchyard_model::{ErrorKind, ModelMessage};
    use switchyard_test_model::{
        PresetEvent, PresetFailure, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn request() -> ModelRequest {
        ModelRequest {
            messages: vec![ModelMessage::user_text("Hi")],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::with_events([
                PresetEvent::MessageDelta("How ".to_owned()),
                PresetEvent::MessageDelta("are ".to_owned()),
                PresetEvent::MessageDelta("you?".to_owned()),
            ]),
        ]);
        let client = ModelClient::new(provider.clone());

        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink: TranscriptSink = {
            let seen = Arc::clone(&seen);
            Arc::new(move |delta| seen.lock().unwrap().push(delta.to_owned()))
        };
        let resp = client.send_request(request(), Some(sink)).await.unwrap();

        assert_eq!(resp.transcript, "How are you?");
        assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
        assert!(resp.tool_calls.is_empty());
        assert_eq!(*seen.lock().unwrap(), ["How ", "are ", "you?"]);
        assert_eq!(provider.requests(), vec![request()]);
    }

    #[tokio::test]
    async fn test_error_handling() {
        let provider = TestModelProvider::with_responses([
            PresetResponse::failing(PresetFailure::Moderated),
        ]);
        let client = ModelClient::new(provider);

        let err = client.send_request(request(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Moderated);

        // The script is exhausted now.
        let err = client.send_request(request(), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }
}
