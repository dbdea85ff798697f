//! Tools a specialist lets its model call.

mod approval;
mod error;
mod executor;
mod object;

use serde::de::DeserializeOwned;
use serde_json::Value;

pub use approval::{Approval, ApprovalHook};
pub use error::{Error, ErrorKind};
pub(crate) use executor::Executor;
pub(crate) use object::{ToolObject, ToolObjectImpl};

/// The result of a tool call: text for the model, or an error.
pub type ToolResult = Result<String, Error>;

/// A tool that can be called by the model.
///
/// Tools should be stateless. Anything a tool needs at execution time
/// (a working directory, an interpreter path, ...) is fixed when the tool
/// is created and copied into the future returned by [`Tool::execute`].
pub trait Tool: Send + Sync + 'static {
    /// The input the tool accepts, deserialized from the model's
    /// arguments.
    type Input: DeserializeOwned + Send + 'static;

    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description shown to the model.
    fn description(&self) -> &str;

    /// Returns the JSON schema of [`Tool::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Describes a call for the user to approve.
    fn make_approval(&self, input: &Self::Input) -> Approval;

    /// Executes the tool.
    ///
    /// The returned future must not borrow `self`, and dropping it should
    /// stop the work.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;
}
