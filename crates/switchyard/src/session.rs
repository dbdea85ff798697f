use std::sync::Arc;
use std::time::Duration;

use switchyard_core::tool::Approval as ToolApproval;
use switchyard_core::{
    ActorDeadError, AgentId, Attachment, AttachmentDelta, AttachmentPolicy,
    Conversation, ConversationBuilder, ConversationState, GenerationError,
    MessageComposer, SpecialistBuilder, StateDelta, TurnControllerBuilder,
    TurnInput,
};
use switchyard_model::ModelProvider;

use crate::prompts;
use crate::tools::RunCodeTool;

type TranscriptCallback = Arc<dyn Fn(&str, AgentId) + Send + Sync>;
type IdleCallback = Box<dyn Fn() + Send + Sync>;
type FinishedCallback = Box<dyn Fn(AgentId) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&GenerationError) + Send + Sync>;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    multimodal: SpecialistBuilder,
    coding: SpecialistBuilder,
    run_code: RunCodeTool,
    composer: MessageComposer,
    on_transcript: Option<TranscriptCallback>,
    on_idle: Option<IdleCallback>,
    on_turn_finished: Option<FinishedCallback>,
    on_error: Option<ErrorCallback>,
}

impl SessionBuilder {
    /// Creates a session builder with a model provider for each
    /// specialist.
    pub fn with_model_providers<M, C>(multimodal: M, coding: C) -> Self
    where
        M: ModelProvider + 'static,
        C: ModelProvider + 'static,
    {
        Self {
            multimodal: SpecialistBuilder::with_model_provider(
                "multimodal",
                multimodal,
            )
            .with_system_prompt(prompts::multimodal()),
            coding: SpecialistBuilder::with_model_provider("coding", coding)
                .with_system_prompt(prompts::coding()),
            run_code: RunCodeTool::new(),
            composer: MessageComposer::default(),
            on_transcript: None,
            on_idle: None,
            on_turn_finished: None,
            on_error: None,
        }
    }

    /// Sets which pending attachments go into a composed message.
    #[inline]
    pub fn with_attachment_policy(mut self, policy: AttachmentPolicy) -> Self {
        self.composer = self.composer.with_policy(policy);
        self
    }

    /// Sets the text sent with attachments when the user wrote nothing.
    #[inline]
    pub fn with_fallback_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.composer = self.composer.with_fallback_prompt(prompt);
        self
    }

    /// Sets how long a code snippet may run.
    #[inline]
    pub fn with_code_timeout(mut self, timeout: Duration) -> Self {
        self.run_code = self.run_code.with_timeout(timeout);
        self
    }

    /// Attaches a callback to be invoked when the session is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Attaches a callback to be invoked when a specialist streams text.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, AgentId) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Attaches a callback to be invoked when the coding specialist wants
    /// to run code. Without one, every run is approved.
    #[inline]
    pub fn on_code_request(
        mut self,
        on_code_request: impl Fn(ToolApproval) + Send + Sync + 'static,
    ) -> Self {
        self.coding = self.coding.on_tool_request(on_code_request);
        self
    }

    /// Attaches a callback to be invoked after a turn's reply is stored.
    #[inline]
    pub fn on_turn_finished(
        mut self,
        on_turn_finished: impl Fn(AgentId) + Send + Sync + 'static,
    ) -> Self {
        self.on_turn_finished = Some(Box::new(on_turn_finished));
        self
    }

    /// Attaches a callback to be invoked when a turn fails.
    #[inline]
    pub fn on_error(
        mut self,
        on_error: impl Fn(&GenerationError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Builds a new session.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Session {
        let mut multimodal = self.multimodal;
        let mut coding = self.coding.with_tool(self.run_code);
        if let Some(on_transcript) = self.on_transcript {
            multimodal = multimodal.on_transcript({
                let on_transcript = Arc::clone(&on_transcript);
                move |text| on_transcript(text, AgentId::Multimodal)
            });
            coding = coding
                .on_transcript(move |text| on_transcript(text, AgentId::Coding));
        }

        let controller =
            TurnControllerBuilder::new(multimodal.build(), coding.build())
                .with_composer(self.composer)
                .build();

        let mut builder = ConversationBuilder::with_controller(controller);
        if let Some(on_idle) = self.on_idle {
            builder = builder.on_idle(on_idle);
        }
        if let Some(on_turn_finished) = self.on_turn_finished {
            builder = builder.on_turn_finished(on_turn_finished);
        }
        if let Some(on_error) = self.on_error {
            builder = builder.on_turn_failed(move |err| on_error(err));
        }
        debug!("session created");

        Session {
            conversation: builder.build(),
        }
    }
}

/// A chat session, like a window that displays messages and has an input
/// box with an attach button.
///
/// The session is basically a wrapper around [`Conversation`] whose turns
/// go to the built-in specialists.
pub struct Session {
    conversation: Conversation,
}

impl Session {
    /// Sends a message to the session. Pending attachments go with it.
    #[inline]
    pub fn send_message(&self, message: &str) -> Result<(), ActorDeadError> {
        self.send(TurnInput::text(message))
    }

    /// Sends an input with its own attachments.
    #[inline]
    pub fn send(&self, input: TurnInput) -> Result<(), ActorDeadError> {
        self.conversation.send(input)
    }

    /// Stages a base64-encoded image for the next turn.
    #[inline]
    pub fn attach_image<A: Into<Attachment>>(
        &self,
        image: A,
    ) -> Result<(), ActorDeadError> {
        self.conversation.update(StateDelta {
            images: AttachmentDelta::append(vec![image.into()]),
            ..Default::default()
        })
    }

    /// Stages a base64-encoded audio clip for the next turn.
    #[inline]
    pub fn attach_audio<A: Into<Attachment>>(
        &self,
        audio: A,
    ) -> Result<(), ActorDeadError> {
        self.conversation.update(StateDelta {
            audios: AttachmentDelta::append(vec![audio.into()]),
            ..Default::default()
        })
    }

    /// Runs a turn without new text, e.g. for staged attachments.
    #[inline]
    pub fn run_turn(&self) -> Result<(), ActorDeadError> {
        self.conversation.run_turn()
    }

    /// Aborts the running turn.
    #[inline]
    pub fn cancel(&self) -> Result<(), ActorDeadError> {
        self.conversation.cancel_turn()
    }

    /// Returns a copy of the conversation so far.
    #[inline]
    pub async fn snapshot(&self) -> Result<ConversationState, ActorDeadError> {
        self.conversation.snapshot().await
    }
}
