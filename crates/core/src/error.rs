use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use switchyard_model::{ErrorKind as ProviderErrorKind, ModelProviderError};

use crate::tool::Error as ToolError;

/// The kind of a [`GenerationError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationErrorKind {
    /// The provider is rate limited.
    RateLimited,
    /// The provider refused the content.
    Moderated,
    /// Any other provider failure, including malformed responses.
    Provider,
    /// A tool call failed or was rejected.
    Tool,
    /// The model kept calling tools past the step limit.
    StepLimitExceeded,
}

impl Display for GenerationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationErrorKind::RateLimited => "rate limited",
            GenerationErrorKind::Moderated => "content moderated",
            GenerationErrorKind::Provider => "provider error",
            GenerationErrorKind::Tool => "tool failure",
            GenerationErrorKind::StepLimitExceeded => "step limit exceeded",
        };
        f.write_str(s)
    }
}

/// A failed turn.
///
/// A turn that fails produces no state delta.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenerationError {
    kind: GenerationErrorKind,
    reason: Option<String>,
}

impl GenerationError {
    /// Creates an error of the given kind.
    #[inline]
    pub fn new(kind: GenerationErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Attaches a reason.
    #[inline]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub(crate) fn from_provider(err: &dyn ModelProviderError) -> Self {
        let kind = match err.kind() {
            ProviderErrorKind::RateLimitExceeded => GenerationErrorKind::RateLimited,
            ProviderErrorKind::Moderated => GenerationErrorKind::Moderated,
            ProviderErrorKind::MalformedResponse | ProviderErrorKind::Other => {
                GenerationErrorKind::Provider
            }
        };
        Self::new(kind).with_reason(err.to_string())
    }

    pub(crate) fn from_tool(name: &str, err: &ToolError) -> Self {
        Self::new(GenerationErrorKind::Tool).with_reason(format!("`{name}`: {err}"))
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> GenerationErrorKind {
        self.kind
    }

    /// Returns the reason, or a description of the kind if there is none.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match &self.reason {
            Some(reason) => Cow::Borrowed(reason.as_str()),
            None => Cow::Owned(self.kind.to_string()),
        }
    }
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for GenerationError {}
