use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::state::ConversationState;

/// Identifies one of the specialists a turn can be routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    /// Understands images and audio.
    Multimodal,
    /// Writes and runs code.
    Coding,
}

impl Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentId::Multimodal => f.write_str("multimodal"),
            AgentId::Coding => f.write_str("coding"),
        }
    }
}

/// Picks the specialist for the next turn.
///
/// Only pending attachments matter, the history never changes the route.
#[inline]
pub fn route(state: &ConversationState) -> AgentId {
    if state.images.is_empty() && state.audios.is_empty() {
        AgentId::Coding
    } else {
        AgentId::Multimodal
    }
}
