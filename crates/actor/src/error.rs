use std::error::Error;
use std::fmt;

/// Returned when a message is sent to an actor that is no longer running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorDeadError;

impl fmt::Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("actor is no longer running")
    }
}

impl Error for ActorDeadError {}
