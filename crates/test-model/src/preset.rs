use serde::{Deserialize, Serialize};
use switchyard_model::{ErrorKind, ToolCallRequest};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "tool_call")]
    ToolCall(ToolCallRequest),
}

/// A failure the provider reports instead of a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    RateLimited,
    Moderated,
    Other,
}

impl PresetFailure {
    #[inline]
    pub(crate) fn kind(self) -> ErrorKind {
        match self {
            PresetFailure::RateLimited => ErrorKind::RateLimitExceeded,
            PresetFailure::Moderated => ErrorKind::Moderated,
            PresetFailure::Other => ErrorKind::Other,
        }
    }
}

/// The preset response for one model request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
    /// If set, the request fails with this error and no events are sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<PresetFailure>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a `PresetResponse` with a single text message.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::with_events([PresetEvent::MessageDelta(text.into())])
    }

    /// Creates a `PresetResponse` that fails the request.
    #[inline]
    pub fn failing(failure: PresetFailure) -> Self {
        Self {
            events: vec![],
            failure: Some(failure),
        }
    }
}
