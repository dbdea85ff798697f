use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The provider returned something that couldn't be understood.
    MalformedResponse,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Moderated => "content moderated",
            ErrorKind::RateLimitExceeded => "rate limit exceeded",
            ErrorKind::MalformedResponse => "malformed response",
            ErrorKind::Other => "provider error",
        };
        f.write_str(s)
    }
}
