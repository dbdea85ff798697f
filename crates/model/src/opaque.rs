use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific message kept in the history as-is.
///
/// Some models need their own complete message back in later requests
/// (an assistant message with tool calls, reasoning content, ...), which
/// the types in this crate cannot represent without losing detail. A
/// provider wraps its native message in an `OpaqueMessage`, and unwraps it
/// when serializing the next request.
///
/// Two opaque messages are equal iff their ids are equal.
#[derive(Clone)]
pub struct OpaqueMessage {
    id: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueMessage {
    /// Creates a new `OpaqueMessage`.
    ///
    /// The `id` should be unique across the conversation.
    #[inline]
    pub fn new<ID: AsRef<str>, T: Send + Sync + 'static>(id: ID, value: T) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
            value: Arc::new(value),
        }
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the native message if it has type `T`.
    #[inline]
    pub fn to_raw<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id).finish()
    }
}

impl PartialEq for OpaqueMessage {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
