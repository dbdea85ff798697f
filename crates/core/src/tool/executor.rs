use std::collections::BTreeMap;
use std::sync::Arc;

use switchyard_model::{ModelTool, ToolCallRequest};
use tracing::Instrument;

use super::object::ToolFuture;
use super::{ApprovalHook, Error, ToolObject};

/// Runs the tool calls of one specialist.
#[derive(Clone, Default)]
pub(crate) struct Executor {
    tools: BTreeMap<String, Arc<dyn ToolObject>>,
    hook: Option<ApprovalHook>,
}

impl Executor {
    pub fn new(tools: Vec<Arc<dyn ToolObject>>, hook: Option<ApprovalHook>) -> Self {
        let tools = tools
            .into_iter()
            .map(|tool| (tool.name().to_owned(), tool))
            .collect();
        Self { tools, hook }
    }

    /// Returns the definitions sent to the model, ordered by name.
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools
            .values()
            .map(|tool| ModelTool {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameter_schema().clone(),
            })
            .collect()
    }

    /// Runs one tool call.
    pub fn execute(&self, req: ToolCallRequest) -> ToolFuture {
        let Some(tool) = self.tools.get(&req.name) else {
            warn!("tool not found: {}", req.name);
            let err = Error::not_found().with_reason(format!("no tool named `{}`", req.name));
            return Box::pin(std::future::ready(Err(err)));
        };

        trace!("calling `{}` ({}) with {:?}", req.name, req.id, req.arguments);
        let span = debug_span!("tool call", name = %req.name, id = %req.id);
        let fut = Arc::clone(tool).call(req.arguments, self.hook.as_ref());
        Box::pin(fut.instrument(span))
    }
}
