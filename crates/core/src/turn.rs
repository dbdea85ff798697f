//! One turn: route, compose, invoke, finalize.

use std::borrow::Cow;
use std::sync::Arc;

use switchyard_model::ModelMessage;
use tracing::Instrument;

use crate::composer::MessageComposer;
use crate::error::GenerationError;
use crate::router::{AgentId, route};
use crate::specialist::SpecialistAgent;
use crate::state::{ConversationState, StateDelta};

/// The stages a turn passes through, in order.
///
/// `Composed` only happens for multimodal turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TurnStage {
    /// The turn received its state.
    Start,
    /// A specialist was picked.
    Routed(AgentId),
    /// The multimodal message was composed and spliced into the history.
    Composed,
    /// The specialist is generating.
    Invoked,
    /// The delta is ready.
    Finalized,
}

/// The result of a successful turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The specialist that handled the turn.
    pub agent: AgentId,
    /// The delta to fold into the conversation state.
    pub delta: StateDelta,
}

type StageCallback = Arc<dyn Fn(TurnStage) + Send + Sync>;

/// Runs turns against conversation states.
///
/// The controller holds no conversation state of its own: it reads a
/// state and returns a delta, leaving the fold to the caller.
#[derive(Clone)]
pub struct TurnController {
    composer: MessageComposer,
    multimodal: SpecialistAgent,
    coding: SpecialistAgent,
    on_stage: Option<StageCallback>,
}

impl TurnController {
    /// Returns the specialist for `agent`.
    #[inline]
    pub fn specialist(&self, agent: AgentId) -> &SpecialistAgent {
        match agent {
            AgentId::Multimodal => &self.multimodal,
            AgentId::Coding => &self.coding,
        }
    }

    /// Returns the composer used by multimodal turns.
    #[inline]
    pub fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    /// Runs one turn against `state`.
    ///
    /// On success the outcome's delta holds the specialist's messages and
    /// clears both attachment buffers. On failure there is no delta, and
    /// dropping the future before it completes has the same effect.
    pub async fn run_turn(
        &self,
        state: &ConversationState,
    ) -> Result<TurnOutcome, GenerationError> {
        let span = debug_span!(
            "turn",
            messages = state.messages.len(),
            images = state.images.len(),
            audios = state.audios.len(),
        );
        self.run_stages(state).instrument(span).await
    }

    async fn run_stages(
        &self,
        state: &ConversationState,
    ) -> Result<TurnOutcome, GenerationError> {
        self.enter(TurnStage::Start);

        let agent = route(state);
        self.enter(TurnStage::Routed(agent));

        let history: Cow<'_, [ModelMessage]> = match agent {
            AgentId::Multimodal => {
                let spliced = self.composer.splice(state);
                self.enter(TurnStage::Composed);
                Cow::Owned(spliced)
            }
            AgentId::Coding => Cow::Borrowed(state.messages.as_slice()),
        };

        self.enter(TurnStage::Invoked);
        let messages = self
            .specialist(agent)
            .generate(&history)
            .await
            .inspect_err(|err| warn!("{agent} turn failed: {err}"))?;

        self.enter(TurnStage::Finalized);
        Ok(TurnOutcome {
            agent,
            delta: StateDelta::turn_result(messages),
        })
    }

    fn enter(&self, stage: TurnStage) {
        debug!("stage: {stage:?}");
        if let Some(on_stage) = &self.on_stage {
            on_stage(stage);
        }
    }
}

/// [`TurnController`] builder.
pub struct TurnControllerBuilder {
    composer: MessageComposer,
    multimodal: SpecialistAgent,
    coding: SpecialistAgent,
    on_stage: Option<StageCallback>,
}

impl TurnControllerBuilder {
    /// Creates a builder with the two specialists.
    #[inline]
    pub fn new(multimodal: SpecialistAgent, coding: SpecialistAgent) -> Self {
        Self {
            composer: MessageComposer::default(),
            multimodal,
            coding,
            on_stage: None,
        }
    }

    /// Sets the composer for multimodal turns.
    #[inline]
    pub fn with_composer(mut self, composer: MessageComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Attaches a callback invoked on every stage a turn enters.
    #[inline]
    pub fn on_stage(
        mut self,
        on_stage: impl Fn(TurnStage) + Send + Sync + 'static,
    ) -> Self {
        self.on_stage = Some(Arc::new(on_stage));
        self
    }

    /// Builds the controller.
    #[inline]
    pub fn build(self) -> TurnController {
        TurnController {
            composer: self.composer,
            multimodal: self.multimodal,
            coding: self.coding,
            on_stage: self.on_stage,
        }
    }
}
