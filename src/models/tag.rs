use serde::{Deserialize, Serialize};

use super::TagId;

/// A node of the tag forest.
///
/// Tags only know their parent; children are derived by [`super::TagTree`]
/// from the parent pointers of all tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    name: String,
    parent_id: Option<TagId>,
}

impl Tag {
    /// Creates a root tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use reportdb::{Tag, TagId};
    ///
    /// let tag = Tag::new(TagId::new(1), "finance");
    /// assert_eq!(tag.name(), "finance");
    /// assert!(tag.is_root());
    /// ```
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
        }
    }

    /// Creates a tag attached under `parent_id`.
    pub fn with_parent(id: TagId, name: impl Into<String>, parent_id: Option<TagId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id,
        }
    }

    /// Returns the tag's unique identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns the tag's name within its parent scope.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent tag, if any.
    pub fn parent_id(&self) -> Option<TagId> {
        self.parent_id
    }

    /// Returns true when the tag has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
