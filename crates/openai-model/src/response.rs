use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use serde_json::Value;
use switchyard_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};

use crate::Error;
use crate::io::{Sse, SseError};
use crate::proto::{
    ChatCompletionChunk, FunctionCall, Message, StreamPayload, ToolCall,
    ToolCallDelta,
};

type Fetch = Pin<
    Box<dyn Future<Output = (Sse, Result<Option<String>, SseError>)> + Send>,
>;

/// A streamed chat completion.
///
/// The SSE reader is moved into a boxed future for each read and handed
/// back when the read completes, so the response itself stays `Unpin`.
pub struct OpenAIResponse {
    sse: Option<Sse>,
    fetch: Option<Fetch>,
    acc: Accumulator,
    ready_events: VecDeque<ModelResponseEvent>,
    finished: bool,
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        Self {
            sse: Some(sse),
            fetch: None,
            acc: Accumulator::default(),
            ready_events: VecDeque::new(),
            finished: false,
        }
    }

    fn fail(&mut self, err: Error) -> Poll<Result<Option<ModelResponseEvent>, Error>> {
        self.finished = true;
        self.sse = None;
        self.ready_events.clear();
        Poll::Ready(Err(err))
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.get_mut();
        loop {
            if let Some(event) = this.ready_events.pop_front() {
                return Poll::Ready(Ok(Some(event)));
            }
            if this.finished {
                return Poll::Ready(Ok(None));
            }

            if this.fetch.is_none() {
                let Some(mut sse) = this.sse.take() else {
                    return Poll::Ready(Ok(None));
                };
                this.fetch = Some(Box::pin(async move {
                    let result = sse.next_event().await;
                    (sse, result)
                }));
            }
            let Some(fetch) = this.fetch.as_mut() else {
                return Poll::Ready(Ok(None));
            };
            let (sse, result) = ready!(fetch.as_mut().poll(cx));
            this.fetch = None;
            this.sse = Some(sse);

            let data = match result {
                Ok(Some(data)) => data,
                Ok(None) => {
                    // Some servers close the stream without `[DONE]`.
                    if let Err(err) = this.acc.finish(&mut this.ready_events) {
                        return this.fail(err);
                    }
                    this.finished = true;
                    continue;
                }
                Err(err) => {
                    return this.fail(Error::new(
                        format!("failed to read stream: {err:?}"),
                        ErrorKind::Other,
                    ));
                }
            };
            trace!("got sse event: {data}");

            if data == "[DONE]" {
                if let Err(err) = this.acc.finish(&mut this.ready_events) {
                    return this.fail(err);
                }
                this.finished = true;
                continue;
            }
            if let Err(err) = this.acc.ingest(&data, &mut this.ready_events) {
                return this.fail(err);
            }
        }
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.acc
            .full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}

#[derive(Default)]
struct PartialToolCall {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed chunks into events and the complete assistant message.
#[derive(Default)]
struct Accumulator {
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<PartialToolCall>,
    finish_reason: Option<ModelFinishReason>,
    full_msg: Option<(String, Message)>,
}

impl Accumulator {
    fn ingest(
        &mut self,
        data: &str,
        events: &mut VecDeque<ModelResponseEvent>,
    ) -> Result<(), Error> {
        let payload = serde_json::from_str::<StreamPayload>(data).map_err(|err| {
            Error::new(format!("malformed chunk: {err}"), ErrorKind::MalformedResponse)
        })?;
        let chunk = match payload {
            StreamPayload::Chunk(chunk) => chunk,
            StreamPayload::Error { error } => {
                let message = match error.code {
                    Some(code) => format!("{} ({code})", error.message),
                    None => error.message,
                };
                return Err(Error::new(message, ErrorKind::Other));
            }
        };
        self.ingest_chunk(chunk, events)
    }

    fn ingest_chunk(
        &mut self,
        chunk: ChatCompletionChunk,
        events: &mut VecDeque<ModelResponseEvent>,
    ) -> Result<(), Error> {
        if self.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id {
            return Err(Error::new(
                "chunk id mismatch",
                ErrorKind::MalformedResponse,
            ));
        }

        // The trailing usage chunk has no choices.
        for choice in chunk.choices {
            let delta = choice.delta;
            if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                self.content.push_str(&content);
                events.push_back(ModelResponseEvent::MessageDelta(content));
            }
            if let Some(reasoning) = delta.reasoning_content {
                self.reasoning_content
                    .get_or_insert_default()
                    .push_str(&reasoning);
            }
            for tool_call in delta.tool_calls.into_iter().flatten() {
                self.patch_tool_call(tool_call);
            }
            match choice.finish_reason.as_deref() {
                None => {}
                Some("tool_calls") => {
                    self.finish_reason = Some(ModelFinishReason::ToolCalls)
                }
                Some("content_filter") => {
                    return Err(Error::new(
                        "response blocked by content filter",
                        ErrorKind::Moderated,
                    ));
                }
                Some(_) => self.finish_reason = Some(ModelFinishReason::Stop),
            }
        }
        Ok(())
    }

    fn patch_tool_call(&mut self, delta: ToolCallDelta) {
        let idx = match self.tool_calls.iter().position(|t| t.index == delta.index) {
            Some(idx) => idx,
            None => {
                self.tool_calls.push(PartialToolCall {
                    index: delta.index,
                    ..Default::default()
                });
                self.tool_calls.len() - 1
            }
        };
        let partial = &mut self.tool_calls[idx];
        if let Some(id) = delta.id {
            partial.id.push_str(&id);
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name {
                partial.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                partial.arguments.push_str(&arguments);
            }
        }
    }

    /// Emits the collected tool calls and the completion event, and builds
    /// the full message. Idempotent.
    fn finish(
        &mut self,
        events: &mut VecDeque<ModelResponseEvent>,
    ) -> Result<(), Error> {
        if self.full_msg.is_some() {
            return Ok(());
        }

        let mut tool_calls = Vec::with_capacity(self.tool_calls.len());
        for partial in &self.tool_calls {
            let arguments = if partial.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&partial.arguments).map_err(|err| {
                    Error::new(
                        format!("invalid arguments for `{}`: {err}", partial.name),
                        ErrorKind::MalformedResponse,
                    )
                })?
            };
            events.push_back(ModelResponseEvent::ToolCall(ToolCallRequest {
                id: partial.id.clone(),
                name: partial.name.clone(),
                arguments,
            }));
            tool_calls.push(ToolCall {
                id: partial.id.clone(),
                r#type: "function",
                function: FunctionCall {
                    name: partial.name.clone(),
                    arguments: partial.arguments.clone(),
                },
            });
        }

        let finish_reason = self.finish_reason.unwrap_or(if tool_calls.is_empty() {
            ModelFinishReason::Stop
        } else {
            ModelFinishReason::ToolCalls
        });
        events.push_back(ModelResponseEvent::Completed(finish_reason));

        let id = self.id.clone().unwrap_or_default();
        self.full_msg = Some((
            id,
            Message::Assistant {
                content: Some(std::mem::take(&mut self.content)),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                reasoning_content: self.reasoning_content.take(),
            },
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;

    use super::*;
    use crate::io::Chunks;

    const TOOL_CALL_STREAM: &[u8] = br#"data: {"id":"c1","choices":[{"delta":{"role":"assistant","content":"Running "},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"content":"it."},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"run_code","arguments":""}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"code\":"}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"print(1)\"}"}}]},"finish_reason":null}]}

data: {"id":"c1","choices":[{"delta":{},"finish_reason":"tool_calls"}]}

data: {"id":"c1","choices":[],"usage":{"prompt_tokens":5,"completion_tokens":7}}

data: [DONE]

"#;

    async fn collect(
        resp: OpenAIResponse,
    ) -> (Vec<ModelResponseEvent>, Option<OpaqueMessage>) {
        let mut resp = pin!(resp);
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        (events, resp.make_opaque_message())
    }

    #[tokio::test]
    async fn test_tool_call_stream() {
        let sse = Sse::new(Chunks::canned([TOOL_CALL_STREAM]));
        let (events, opaque) = collect(OpenAIResponse::from_sse(sse)).await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Running ".to_owned()),
                ModelResponseEvent::MessageDelta("it.".to_owned()),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_1".to_owned(),
                    name: "run_code".to_owned(),
                    arguments: json!({ "code": "print(1)" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );

        let opaque = opaque.unwrap();
        assert_eq!(opaque.id(), "c1");
        let Some(Message::Assistant {
            content,
            tool_calls: Some(tool_calls),
            ..
        }) = opaque.to_raw::<Message>()
        else {
            panic!("expected an assistant message with tool calls");
        };
        assert_eq!(content.as_deref(), Some("Running it."));
        assert_eq!(tool_calls[0].function.arguments, r#"{"code":"print(1)"}"#);
    }

    #[tokio::test]
    async fn test_stream_without_done() {
        let sse = Sse::new(Chunks::canned([
            br#"data: {"id":"c2","choices":[{"delta":{"content":"Hi"},"finish_reason":"stop"}]}

"#
            .as_slice(),
        ]));
        let (events, opaque) = collect(OpenAIResponse::from_sse(sse)).await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("Hi".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
        assert!(opaque.is_some());
    }

    #[tokio::test]
    async fn test_error_payload() {
        let sse = Sse::new(Chunks::canned([
            br#"data: {"error":{"message":"overloaded","code":"server_error"}}

"#
            .as_slice(),
        ]));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "overloaded (server_error)");
        assert_eq!(
            poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_content_filter() {
        let sse = Sse::new(Chunks::canned([
            br#"data: {"id":"c3","choices":[{"delta":{},"finish_reason":"content_filter"}]}

"#
            .as_slice(),
        ]));
        let mut resp = pin!(OpenAIResponse::from_sse(sse));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(
            switchyard_model::ModelProviderError::kind(&err),
            ErrorKind::Moderated
        );
    }
}
