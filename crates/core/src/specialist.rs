//! Specialists: a model, a system prompt and a tool set bound to one role.

use std::iter;
use std::sync::Arc;

use switchyard_model::{ModelMessage, ModelProvider, ModelRequest, ToolCallResult};
use tracing::Instrument;

use crate::error::{GenerationError, GenerationErrorKind};
use crate::model_client::{ModelClient, TranscriptSink};
use crate::tool::{ApprovalHook, Executor as ToolExecutor, Tool, ToolObject, ToolObjectImpl};

/// How many model calls one turn may make by default.
pub const DEFAULT_STEP_LIMIT: usize = 25;

/// A configured generation capability for one role.
///
/// Cloning is cheap, clones share the provider and the tools.
#[derive(Clone)]
pub struct SpecialistAgent {
    name: Arc<str>,
    model_client: ModelClient,
    system_prompt: Arc<str>,
    tools: ToolExecutor,
    step_limit: usize,
    on_transcript: Option<TranscriptSink>,
}

impl SpecialistAgent {
    /// Returns the name given to this specialist.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the system prompt.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Generates the reply to `history`.
    ///
    /// The model is called with the system prompt followed by `history`.
    /// While it asks for tools, the calls run one by one and the model is
    /// called again with their results. Returns every message produced
    /// on the way, the final answer last.
    pub async fn generate(
        &self,
        history: &[ModelMessage],
    ) -> Result<Vec<ModelMessage>, GenerationError> {
        let span = debug_span!("generate", specialist = %self.name);
        self.run_steps(history).instrument(span).await
    }

    async fn run_steps(
        &self,
        history: &[ModelMessage],
    ) -> Result<Vec<ModelMessage>, GenerationError> {
        let mut produced = vec![];
        for step in 1..=self.step_limit {
            let req = ModelRequest {
                messages: self.request_messages(history, &produced),
                tools: self.tools.definitions(),
            };
            let resp = self
                .model_client
                .send_request(req, self.on_transcript.clone())
                .await
                .map_err(|err| GenerationError::from_provider(err.as_ref()))?;

            produced.push(match resp.opaque_msg {
                Some(opaque_msg) => ModelMessage::Opaque(opaque_msg),
                None => ModelMessage::Assistant(resp.transcript),
            });
            if resp.tool_calls.is_empty() {
                debug!("finished after {step} step(s)");
                return Ok(produced);
            }

            for call in resp.tool_calls {
                let id = call.id.clone();
                let name = call.name.clone();
                let content = self
                    .tools
                    .execute(call)
                    .await
                    .map_err(|err| GenerationError::from_tool(&name, &err))?;
                produced.push(ModelMessage::Tool(ToolCallResult { id, content }));
            }
        }

        warn!("still calling tools after {} steps", self.step_limit);
        Err(GenerationError::new(GenerationErrorKind::StepLimitExceeded)
            .with_reason(format!("{} model calls", self.step_limit)))
    }

    fn request_messages(
        &self,
        history: &[ModelMessage],
        produced: &[ModelMessage],
    ) -> Vec<ModelMessage> {
        let system = (!self.system_prompt.is_empty())
            .then(|| ModelMessage::System(self.system_prompt.to_string()));
        system
            .into_iter()
            .chain(history.iter().cloned())
            .chain(produced.iter().cloned())
            .collect()
    }
}

/// [`SpecialistAgent`] builder.
pub struct SpecialistBuilder {
    name: String,
    model_client: ModelClient,
    system_prompt: String,
    tools: Vec<Arc<dyn ToolObject>>,
    on_tool_request: Option<ApprovalHook>,
    on_transcript: Option<TranscriptSink>,
    step_limit: usize,
}

impl SpecialistBuilder {
    /// Creates a builder for a specialist backed by `provider`.
    pub fn with_model_provider<N, P>(name: N, provider: P) -> Self
    where
        N: Into<String>,
        P: ModelProvider + 'static,
    {
        Self {
            name: name.into(),
            model_client: ModelClient::new(provider),
            system_prompt: String::new(),
            tools: vec![],
            on_tool_request: None,
            on_transcript: None,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Sets the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(ToolObjectImpl(tool)));
        self
    }

    /// Sets the hook that approves tool calls. Without one, every call is
    /// approved.
    #[inline]
    pub fn on_tool_request(
        mut self,
        on_tool_request: impl Fn(crate::tool::Approval) + Send + Sync + 'static,
    ) -> Self {
        self.on_tool_request = Some(Arc::new(on_tool_request));
        self
    }

    /// Attaches a callback that receives streamed assistant text.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Sets how many model calls one turn may make. At least one.
    #[inline]
    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit.max(1);
        self
    }

    /// Builds the specialist.
    pub fn build(self) -> SpecialistAgent {
        SpecialistAgent {
            name: Arc::from(self.name),
            model_client: self.model_client,
            system_prompt: Arc::from(self.system_prompt),
            tools: ToolExecutor::new(self.tools, self.on_tool_request),
            step_limit: self.step_limit,
            on_transcript: self.on_transcript,
        }
    }
}
