//! An abstraction layer for the language models behind each specialist.
//!
//! This crate defines the shape of what a specialist sends to a model
//! (ordered messages whose user content may carry image and audio parts)
//! and what it gets back (a stream of response events). It doesn't define
//! any behavior, only the contract providers implement.
//!
//! Wire formats of concrete APIs live in provider crates.

#![deny(missing_docs)]

mod content;
mod error;
mod opaque;
mod provider;
mod request;
mod response;

pub use content::*;
pub use error::*;
pub use opaque::*;
pub use provider::*;
pub use request::*;
pub use response::*;
