//! The turn-dispatch core: conversation state, attachment merging, routing
//! between the multimodal and coding specialists, and the turn loop.
//!
//! A turn reads a [`ConversationState`], sends it to one specialist and
//! returns a [`StateDelta`]. [`Conversation`] keeps a state in memory and
//! folds those deltas one at a time.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod composer;
pub mod conversation;
mod error;
mod model_client;
pub mod reducer;
mod router;
mod specialist;
pub mod state;
pub mod tool;
mod turn;

pub use composer::{AttachmentPolicy, MessageComposer};
pub use conversation::{Conversation, ConversationBuilder};
pub use error::{GenerationError, GenerationErrorKind};
pub use model_client::TranscriptSink;
pub use reducer::AttachmentDelta;
pub use router::{AgentId, route};
pub use specialist::{DEFAULT_STEP_LIMIT, SpecialistAgent, SpecialistBuilder};
pub use state::{Attachment, ConversationState, StateDelta, TurnInput};
pub use switchyard_actor::ActorDeadError;
pub use turn::{TurnController, TurnControllerBuilder, TurnOutcome, TurnStage};
