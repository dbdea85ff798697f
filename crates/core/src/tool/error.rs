use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

/// The kind of a tool call error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The model asked for a tool that doesn't exist.
    NotFound,
    /// The arguments didn't match the tool's input.
    InvalidInput,
    /// The tool failed.
    ExecutionError,
    /// The user rejected the call.
    Rejected,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => f.write_str("tool not found"),
            ErrorKind::InvalidInput => f.write_str("invalid input"),
            ErrorKind::ExecutionError => f.write_str("execution error"),
            ErrorKind::Rejected => f.write_str("rejected by user"),
        }
    }
}

/// A tool call error.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind) -> Self {
        Self { kind, reason: None }
    }

    /// Creates an error of kind [`ErrorKind::NotFound`].
    #[inline]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Creates an error of kind [`ErrorKind::InvalidInput`].
    #[inline]
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates an error of kind [`ErrorKind::ExecutionError`].
    #[inline]
    pub fn execution_error() -> Self {
        Self::new(ErrorKind::ExecutionError)
    }

    /// Creates an error of kind [`ErrorKind::Rejected`].
    #[inline]
    pub fn rejected() -> Self {
        Self::new(ErrorKind::Rejected)
    }

    /// Attaches a reason.
    #[inline]
    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
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

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{}: {reason}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl StdError for Error {}
