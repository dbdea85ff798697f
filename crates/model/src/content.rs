use serde::{Deserialize, Serialize};

/// The content of a user message.
///
/// Most messages carry plain text. A message composed for a multimodal
/// model instead carries an ordered list of typed parts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content.
    Text(String),
    /// An ordered list of typed parts.
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Returns the text if this is plain text content.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Parts(_) => None,
        }
    }
}

impl From<String> for Content {
    #[inline]
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    #[inline]
    fn from(text: &str) -> Self {
        Content::Text(text.to_owned())
    }
}

impl From<Vec<ContentPart>> for Content {
    #[inline]
    fn from(parts: Vec<ContentPart>) -> Self {
        Content::Parts(parts)
    }
}

/// A typed part of multi-part content.
///
/// Binary payloads are text-encoded (base64), and each carries its own MIME
/// type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text part.
    Text {
        /// The text.
        text: String,
    },
    /// An image part.
    Image {
        /// Base64-encoded image data.
        data: String,
        /// MIME type of the image, e.g. `image/jpeg`.
        mime_type: String,
    },
    /// An audio part.
    Audio {
        /// Base64-encoded audio data.
        data: String,
        /// MIME type of the audio, e.g. `audio/wav`.
        mime_type: String,
    },
}

impl ContentPart {
    /// Creates a text part.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }

    /// Creates an image part.
    #[inline]
    pub fn image<D: Into<String>, M: Into<String>>(data: D, mime_type: M) -> Self {
        ContentPart::Image {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Creates an audio part.
    #[inline]
    pub fn audio<D: Into<String>, M: Into<String>>(data: D, mime_type: M) -> Self {
        ContentPart::Audio {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }
}
