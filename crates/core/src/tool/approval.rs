use std::fmt::{self, Debug, Display};
use std::sync::Arc;

/// Called with every tool call that needs the user's approval.
///
/// The hook may answer right away or keep the [`Approval`] and answer
/// later. Dropping it unanswered rejects the call.
pub type ApprovalHook = Arc<dyn Fn(Approval) + Send + Sync>;

#[derive(Debug)]
pub(crate) struct Verdict {
    pub approved: bool,
    pub reason: Option<String>,
}

/// A pending tool call waiting for the user's decision.
pub struct Approval {
    what: String,
    justification: String,
    pub(crate) on_verdict: Option<Box<dyn FnOnce(Verdict) + Send>>,
}

impl Approval {
    /// Creates an approval for `what`, e.g. the code to run.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(what: S1, justification: S2) -> Self {
        Self {
            what: what.into(),
            justification: justification.into(),
            on_verdict: None,
        }
    }

    /// Returns what needs approval.
    #[inline]
    pub fn what(&self) -> &str {
        &self.what
    }

    /// Returns why the model wants to do it.
    #[inline]
    pub fn justification(&self) -> &str {
        &self.justification
    }

    /// Approves the call.
    #[inline]
    pub fn approve(self) {
        self.settle(true, None);
    }

    /// Rejects the call, optionally telling the model why.
    #[inline]
    pub fn reject(self, reason: Option<String>) {
        self.settle(false, reason);
    }

    fn settle(mut self, approved: bool, reason: Option<String>) {
        if let Some(on_verdict) = self.on_verdict.take() {
            on_verdict(Verdict { approved, reason });
        }
    }
}

impl Debug for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Approval")
            .field("what", &self.what)
            .field("justification", &self.justification)
            .finish_non_exhaustive()
    }
}

impl Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.what, self.justification)
    }
}
