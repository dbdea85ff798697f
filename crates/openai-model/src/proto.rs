use mime::Mime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use switchyard_model::{
    Content, ContentPart, ModelMessage, ModelRequest, ModelTool,
};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StreamPayload {
    Chunk(ChatCompletionChunk),
    Error { error: ApiError },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    pub reasoning_content: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    pub id: Option<String>,
    pub function: Option<FunctionDelta>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FunctionDelta {
    pub name: Option<String>,
    pub arguments: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct FunctionTool {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Tool {
    r#type: &'static str,
    function: FunctionTool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolCall {
    pub id: String,
    pub r#type: &'static str,
    pub function: FunctionCall,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserContent {
    Text(String),
    Parts(Vec<Part>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageUrl {
    url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputAudio {
    data: String,
    format: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    InputAudio { input_audio: InputAudio },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: UserContent,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    stream: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

// -----------
// Conversions
// -----------

pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        tools: req.tools.iter().map(create_tool).collect(),
        stream_options: Some(StreamOptions {
            include_usage: true,
        }),
        stream: true,
    }
}

fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(Content::Text(text)) => Message::User {
            content: UserContent::Text(text.clone()),
        },
        ModelMessage::User(Content::Parts(parts)) => Message::User {
            content: UserContent::Parts(parts.iter().map(create_part).collect()),
        },
        ModelMessage::Assistant(content) => Message::Assistant {
            content: Some(content.clone()),
            tool_calls: None,
            reasoning_content: None,
        },
        ModelMessage::Tool(result) => Message::Tool {
            tool_call_id: result.id.clone(),
            content: result.content.clone(),
        },
        ModelMessage::Opaque(opaque_message) => {
            // Opaque messages made by this provider always hold a `Message`.
            match opaque_message.to_raw::<Message>() {
                Some(msg) => msg.clone(),
                None => {
                    warn!("foreign opaque message: {opaque_message:?}");
                    Message::Assistant {
                        content: None,
                        tool_calls: None,
                        reasoning_content: None,
                    }
                }
            }
        }
    }
}

fn create_part(part: &ContentPart) -> Part {
    match part {
        ContentPart::Text { text } => Part::Text { text: text.clone() },
        ContentPart::Image { data, mime_type } => Part::ImageUrl {
            image_url: ImageUrl {
                url: format!("data:{mime_type};base64,{data}"),
            },
        },
        ContentPart::Audio { data, mime_type } => Part::InputAudio {
            input_audio: InputAudio {
                data: data.clone(),
                format: audio_format(mime_type),
            },
        },
    }
}

/// Maps an audio MIME type to the `format` the API expects.
fn audio_format(mime_type: &str) -> String {
    let Ok(mime) = mime_type.parse::<Mime>() else {
        return "wav".to_owned();
    };
    if mime.type_() != mime::AUDIO {
        return "wav".to_owned();
    }
    match mime.subtype().as_str() {
        "wav" | "wave" | "x-wav" | "vnd.wave" => "wav".to_owned(),
        "mpeg" | "mp3" => "mp3".to_owned(),
        other => other.to_owned(),
    }
}

fn create_tool(tool: &ModelTool) -> Tool {
    Tool {
        r#type: "function",
        function: FunctionTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You look at pictures.".to_owned()),
                ModelMessage::User(Content::Parts(vec![
                    ContentPart::text("What is this?"),
                    ContentPart::image("aW1n", "image/jpeg"),
                    ContentPart::audio("YXVk", "audio/wav"),
                ])),
            ],
            tools: vec![ModelTool {
                name: "run_code".to_owned(),
                description: "Runs code.".to_owned(),
                parameters: json!({ "type": "object" }),
            }],
        };
        let config = OpenAIConfigBuilder::with_api_key("xxx")
            .with_model("gpt-4o")
            .build();

        let body = serde_json::to_value(create_request(&request, &config)).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o",
                "messages": [
                    { "role": "system", "content": "You look at pictures." },
                    {
                        "role": "user",
                        "content": [
                            { "type": "text", "text": "What is this?" },
                            {
                                "type": "image_url",
                                "image_url": { "url": "data:image/jpeg;base64,aW1n" }
                            },
                            {
                                "type": "input_audio",
                                "input_audio": { "data": "YXVk", "format": "wav" }
                            }
                        ]
                    }
                ],
                "tools": [{
                    "type": "function",
                    "function": {
                        "name": "run_code",
                        "description": "Runs code.",
                        "parameters": { "type": "object" }
                    }
                }],
                "stream_options": { "include_usage": true },
                "stream": true
            })
        );
    }

    #[test]
    fn test_plain_user_text() {
        let msg = create_message(&ModelMessage::user_text("fix this bug"));
        assert_eq!(
            serde_json::to_value(msg).unwrap(),
            json!({ "role": "user", "content": "fix this bug" })
        );
    }

    #[test]
    fn test_audio_format() {
        assert_eq!(audio_format("audio/wav"), "wav");
        assert_eq!(audio_format("audio/x-wav"), "wav");
        assert_eq!(audio_format("audio/mpeg"), "mp3");
        assert_eq!(audio_format("audio/flac"), "flac");
        assert_eq!(audio_format("not a mime"), "wav");
    }

    #[test]
    fn test_parse_payloads() {
        let chunk: StreamPayload = serde_json::from_str(
            r#"{"id":"c1","choices":[{"delta":{"content":"Hi"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert!(matches!(chunk, StreamPayload::Chunk(c) if c.choices.len() == 1));

        let usage: StreamPayload =
            serde_json::from_str(r#"{"id":"c1","choices":[],"usage":{}}"#).unwrap();
        assert!(matches!(usage, StreamPayload::Chunk(c) if c.choices.is_empty()));

        let error: StreamPayload =
            serde_json::from_str(r#"{"error":{"message":"boom"}}"#).unwrap();
        assert!(matches!(error, StreamPayload::Error { error } if error.message == "boom"));
    }
}
