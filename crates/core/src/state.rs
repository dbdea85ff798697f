//! Conversation state and the deltas folded into it.

use serde::{Deserialize, Serialize};
use switchyard_model::{ModelMessage, Content};

use crate::reducer::AttachmentDelta;

/// MIME type every image attachment is sent with.
pub const IMAGE_MIME_TYPE: &str = "image/jpeg";

/// MIME type every audio attachment is sent with.
pub const AUDIO_MIME_TYPE: &str = "audio/wav";

/// A base64-encoded image or audio payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attachment(String);

impl Attachment {
    /// Creates an attachment from base64-encoded data.
    #[inline]
    pub fn new<S: Into<String>>(data: S) -> Self {
        Self(data.into())
    }

    /// Returns the base64-encoded data.
    #[inline]
    pub fn data(&self) -> &str {
        &self.0
    }
}

impl From<String> for Attachment {
    #[inline]
    fn from(data: String) -> Self {
        Self(data)
    }
}

impl From<&str> for Attachment {
    #[inline]
    fn from(data: &str) -> Self {
        Self(data.to_owned())
    }
}

/// The accumulated state of one conversation.
///
/// `images` and `audios` stage attachments for the next multimodal turn,
/// which clears them when it finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationState {
    /// The conversation history, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Pending images.
    pub images: Vec<Attachment>,
    /// Pending audios.
    pub audios: Vec<Attachment>,
}

impl ConversationState {
    /// Folds a delta into this state.
    ///
    /// Messages are appended, attachments are merged with
    /// [`crate::reducer::merge`] rules.
    pub fn apply(&mut self, delta: StateDelta) {
        let StateDelta {
            messages,
            images,
            audios,
        } = delta;
        self.messages.extend(messages);
        images.apply_to(&mut self.images);
        audios.apply_to(&mut self.audios);
    }

    /// Returns `true` if any image or audio is pending.
    #[inline]
    pub fn has_attachments(&self) -> bool {
        !self.images.is_empty() || !self.audios.is_empty()
    }
}

/// A partial update of a [`ConversationState`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateDelta {
    /// Messages to append.
    pub messages: Vec<ModelMessage>,
    /// Change to the pending images.
    pub images: AttachmentDelta,
    /// Change to the pending audios.
    pub audios: AttachmentDelta,
}

impl StateDelta {
    /// The delta a finished turn produces: the agent's messages, and both
    /// attachment buffers cleared.
    #[inline]
    pub fn turn_result(messages: Vec<ModelMessage>) -> Self {
        Self {
            messages,
            images: AttachmentDelta::Clear,
            audios: AttachmentDelta::Clear,
        }
    }

    /// Returns `true` if applying this delta changes nothing.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.images.is_no_change()
            && self.audios.is_no_change()
    }
}

/// What a user submits for one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnInput {
    /// The message text, if any.
    pub text: Option<String>,
    /// Newly attached images.
    pub images: Vec<Attachment>,
    /// Newly attached audios.
    pub audios: Vec<Attachment>,
}

impl TurnInput {
    /// Creates a text-only input.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Adds an image.
    #[inline]
    pub fn with_image<A: Into<Attachment>>(mut self, image: A) -> Self {
        self.images.push(image.into());
        self
    }

    /// Adds an audio.
    #[inline]
    pub fn with_audio<A: Into<Attachment>>(mut self, audio: A) -> Self {
        self.audios.push(audio.into());
        self
    }

    /// Converts the input into the delta that stages it.
    ///
    /// Blank text adds no message, and new attachments are appended to
    /// the pending ones.
    pub fn into_delta(self) -> StateDelta {
        let messages = self
            .text
            .filter(|text| !text.trim().is_empty())
            .map(|text| ModelMessage::User(Content::Text(text)))
            .into_iter()
            .collect();
        StateDelta {
            messages,
            images: AttachmentDelta::append(self.images),
            audios: AttachmentDelta::append(self.audios),
        }
    }
}
