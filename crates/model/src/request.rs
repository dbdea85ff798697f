use serde_json::Value;

use crate::{Content, OpaqueMessage};

/// A request to be sent to the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// A complete message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user turn, plain text or multi-part.
    User(Content),
    /// An assistant text.
    Assistant(String),
    /// A tool call result.
    Tool(ToolCallResult),
    /// An opaque message (usually the history message from the model).
    Opaque(OpaqueMessage),
}

impl ModelMessage {
    /// Creates a plain text user message.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        ModelMessage::User(Content::Text(text.into()))
    }

    /// Returns the text if this is a plain text user message.
    #[inline]
    pub fn as_user_text(&self) -> Option<&str> {
        match self {
            ModelMessage::User(content) => content.as_text(),
            _ => None,
        }
    }
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolCallResult {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool, typically a
    /// [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
