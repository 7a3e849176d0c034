//! Error types for report and tag operations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::{ReportId, TagId};

/// Kind of stored entity referenced by [`ReportDbError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Report,
    Tag,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Report => write!(f, "report"),
            Entity::Tag => write!(f, "tag"),
        }
    }
}

/// Errors raised by the report store, tag store and search.
#[derive(Debug, Error)]
pub enum ReportDbError {
    /// Unknown report or tag id.
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// A sibling with the same name already exists.
    #[error("tag '{name}' already exists {}", scope_label(.parent))]
    DuplicateTag { name: String, parent: Option<TagId> },

    /// The requested parent tag does not exist.
    #[error("parent tag {parent} does not exist")]
    InvalidParent { parent: TagId },

    /// Moving the tag would make it its own ancestor.
    #[error("cannot move tag {tag} under {parent}: {parent} is the tag itself or one of its descendants")]
    CycleDetected { tag: TagId, parent: TagId },

    /// A tag reference did not resolve to any tag.
    #[error("unknown tag '{name}'")]
    UnknownTag { name: String },

    /// A bare tag name matched tags in more than one scope.
    #[error("tag name '{name}' is ambiguous, use a full path: {}", .candidates.join(", "))]
    AmbiguousTag {
        name: String,
        candidates: Vec<String>,
    },

    /// The name cannot be stored as a single tag segment.
    #[error("invalid tag name '{name}': {reason}")]
    InvalidTagName { name: String, reason: &'static str },

    /// Non-cascading delete of a tag that still has children.
    #[error("tag '{name}' ({tag}) has {children} child tag(s); delete with cascade to remove the subtree")]
    HasChildren {
        tag: TagId,
        name: String,
        children: usize,
    },

    /// Reading or writing an external file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored timestamp out of range: {0}")]
    Timestamp(#[from] time::error::ComponentRange),
}

fn scope_label(parent: &Option<TagId>) -> String {
    match parent {
        Some(parent) => format!("under tag {parent}"),
        None => "at the root".to_string(),
    }
}

impl ReportDbError {
    pub(crate) fn report_not_found(id: ReportId) -> Self {
        Self::NotFound {
            entity: Entity::Report,
            id: id.get(),
        }
    }

    pub(crate) fn tag_not_found(id: TagId) -> Self {
        Self::NotFound {
            entity: Entity::Tag,
            id: id.get(),
        }
    }

    /// True for errors caused by the request rather than by the storage
    /// layer. Front ends use this to pick an exit status.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Database(_) | Self::Timestamp(_))
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, ReportDbError>;
