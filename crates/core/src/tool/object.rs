use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;

use super::{ApprovalHook, Error, Tool, ToolResult};

pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// Object-safe form of [`Tool`].
pub(crate) trait ToolObject: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameter_schema(&self) -> &Value;

    /// Parses the arguments, asks for approval and runs the tool.
    fn call(self: Arc<Self>, arguments: Value, hook: Option<&ApprovalHook>) -> ToolFuture;
}

pub(crate) struct ToolObjectImpl<T: Tool>(pub T);

impl<T: Tool> ToolObject for ToolObjectImpl<T> {
    #[inline]
    fn name(&self) -> &str {
        self.0.name()
    }

    #[inline]
    fn description(&self) -> &str {
        self.0.description()
    }

    #[inline]
    fn parameter_schema(&self) -> &Value {
        self.0.parameter_schema()
    }

    fn call(self: Arc<Self>, arguments: Value, hook: Option<&ApprovalHook>) -> ToolFuture {
        let input: T::Input = match serde_json::from_value(arguments) {
            Ok(input) => input,
            Err(err) => {
                let err = Error::invalid_input().with_reason(err.to_string());
                return Box::pin(std::future::ready(Err(err)));
            }
        };

        // Without a hook every call is approved.
        let Some(hook) = hook else {
            return Box::pin(self.0.execute(input));
        };

        let (verdict_tx, verdict_rx) = oneshot::channel();
        let mut approval = self.0.make_approval(&input);
        approval.on_verdict = Some(Box::new(move |verdict| {
            verdict_tx.send(verdict).ok();
        }));
        hook(approval);

        Box::pin(async move {
            let Ok(verdict) = verdict_rx.await else {
                return Err(Error::rejected().with_reason("approval was dropped"));
            };
            debug!("approval verdict: {verdict:?}");
            if !verdict.approved {
                let mut err = Error::rejected();
                if let Some(reason) = verdict.reason {
                    err = err.with_reason(reason);
                }
                return Err(err);
            }
            self.0.execute(input).await
        })
    }
}
