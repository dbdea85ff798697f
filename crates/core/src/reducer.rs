//! Merge rules for pending attachments.

use crate::state::Attachment;

/// A change to a list of pending attachments.
///
/// Clearing is its own variant, so an empty list never has to stand for
/// "clear".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AttachmentDelta {
    /// Keep the list as it is.
    #[default]
    NoChange,
    /// Empty the list.
    Clear,
    /// Append items to the end of the list, in order.
    Append(Vec<Attachment>),
}

impl AttachmentDelta {
    /// Creates an `Append` delta, or `NoChange` for no items.
    #[inline]
    pub fn append(items: Vec<Attachment>) -> Self {
        if items.is_empty() {
            AttachmentDelta::NoChange
        } else {
            AttachmentDelta::Append(items)
        }
    }

    /// Reads the optional-list form of a delta: absent means no change,
    /// present but empty means clear, anything else is appended.
    #[inline]
    pub fn from_optional(items: Option<Vec<Attachment>>) -> Self {
        match items {
            None => AttachmentDelta::NoChange,
            Some(items) if items.is_empty() => AttachmentDelta::Clear,
            Some(items) => AttachmentDelta::Append(items),
        }
    }

    /// The inverse of [`AttachmentDelta::from_optional`].
    pub fn into_optional(self) -> Option<Vec<Attachment>> {
        match self {
            AttachmentDelta::NoChange => None,
            AttachmentDelta::Clear => Some(vec![]),
            AttachmentDelta::Append(items) if items.is_empty() => None,
            AttachmentDelta::Append(items) => Some(items),
        }
    }

    /// Returns `true` if applying this delta leaves any list unchanged.
    #[inline]
    pub fn is_no_change(&self) -> bool {
        match self {
            AttachmentDelta::NoChange => true,
            AttachmentDelta::Clear => false,
            AttachmentDelta::Append(items) => items.is_empty(),
        }
    }

    /// Applies this delta to `list` in place.
    pub fn apply_to(self, list: &mut Vec<Attachment>) {
        match self {
            AttachmentDelta::NoChange => {}
            AttachmentDelta::Clear => list.clear(),
            AttachmentDelta::Append(items) => list.extend(items),
        }
    }
}

/// Merges `delta` into `old` and returns the new list.
///
/// Appended items keep their order and are not de-duplicated.
pub fn merge(old: &[Attachment], delta: AttachmentDelta) -> Vec<Attachment> {
    let mut merged = old.to_vec();
    delta.apply_to(&mut merged);
    merged
}
