//! A set of built-in tools that specialists can use.

mod run_code;

pub use run_code::{Language, RunCodeTool, RunCodeToolParameters};
