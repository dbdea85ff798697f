//! Builds the user message a multimodal turn sends.

use switchyard_model::{Content, ContentPart, ModelMessage};

use crate::state::{AUDIO_MIME_TYPE, Attachment, ConversationState, IMAGE_MIME_TYPE};

/// The text sent when the user attached media without saying anything.
pub const DEFAULT_FALLBACK_PROMPT: &str = "Analyze this media";

/// Which pending attachments go into a composed message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttachmentPolicy {
    /// Every pending image and audio, in the order they were attached.
    #[default]
    AttachAll,
    /// Only the most recent image and the most recent audio.
    AttachLatest,
}

/// Composes a multi-part user message from the trailing user text and the
/// pending attachments.
///
/// Composing is pure, the same state always gives the same message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageComposer {
    policy: AttachmentPolicy,
    fallback_prompt: String,
}

impl Default for MessageComposer {
    #[inline]
    fn default() -> Self {
        Self {
            policy: AttachmentPolicy::default(),
            fallback_prompt: DEFAULT_FALLBACK_PROMPT.to_owned(),
        }
    }
}

impl MessageComposer {
    /// Sets the attachment policy.
    #[inline]
    pub fn with_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the text used when there is no user text to send.
    #[inline]
    pub fn with_fallback_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.fallback_prompt = prompt.into();
        self
    }

    /// Returns the attachment policy.
    #[inline]
    pub fn policy(&self) -> AttachmentPolicy {
        self.policy
    }

    /// Returns the fallback prompt.
    #[inline]
    pub fn fallback_prompt(&self) -> &str {
        &self.fallback_prompt
    }

    /// Composes the message for `state`.
    ///
    /// The first part is the text of the trailing message if that is a
    /// user message with non-empty plain text, or the fallback prompt
    /// otherwise. Images follow, then audios.
    pub fn compose(&self, state: &ConversationState) -> ModelMessage {
        let text = state
            .messages
            .last()
            .and_then(ModelMessage::as_user_text)
            .filter(|text| !text.is_empty())
            .unwrap_or(self.fallback_prompt.as_str());

        let images = self.select(&state.images);
        let audios = self.select(&state.audios);

        let mut parts = Vec::with_capacity(1 + images.len() + audios.len());
        parts.push(ContentPart::text(text));
        parts.extend(
            images
                .iter()
                .map(|image| ContentPart::image(image.data(), IMAGE_MIME_TYPE)),
        );
        parts.extend(
            audios
                .iter()
                .map(|audio| ContentPart::audio(audio.data(), AUDIO_MIME_TYPE)),
        );
        ModelMessage::User(Content::Parts(parts))
    }

    /// Returns the history to send for a multimodal turn: the stored
    /// messages with the composed message in place of a trailing plain-text
    /// user message, or after the last message otherwise.
    ///
    /// `state` itself is left as it is.
    pub fn splice(&self, state: &ConversationState) -> Vec<ModelMessage> {
        let composed = self.compose(state);
        let kept = match state.messages.last() {
            Some(last) if last.as_user_text().is_some() => {
                &state.messages[..state.messages.len() - 1]
            }
            _ => &state.messages[..],
        };

        let mut history = Vec::with_capacity(kept.len() + 1);
        history.extend_from_slice(kept);
        history.push(composed);
        history
    }

    fn select<'a>(&self, items: &'a [Attachment]) -> &'a [Attachment] {
        match self.policy {
            AttachmentPolicy::AttachAll => items,
            AttachmentPolicy::AttachLatest => match items.last() {
                Some(last) => std::slice::from_ref(last),
                None => &[],
            },
        }
    }
}
