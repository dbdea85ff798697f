//! A small actor runtime on top of tokio.
//!
//! An actor owns a state and handles messages one at a time on its own
//! task, so the state needs no locking. Messages are either types that
//! implement [`Message`] or closures posted with [`Actor::exec`] and
//! [`Actor::call`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::{Actor, WeakActor};
pub use mailbox::Message;
