//! A ready-made switchyard session: a multimodal specialist, a coding
//! specialist with a code runner, and the prompts they work with.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the session into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod prompts;
mod session;
pub mod tools;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`switchyard_core`] crate.
pub mod core {
    pub use switchyard_core::*;
}
