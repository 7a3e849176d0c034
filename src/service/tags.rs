//! Tag store: creation, re-parenting, deletion and closure queries over the
//! tag forest.

use std::collections::BTreeSet;

use rusqlite::OptionalExtension;

use super::{ReportService, load_tree, resolve_reference};
use crate::{
    Tag, TagId, TagNode, TagTree,
    error::{ReportDbError, Result},
    models::PATH_SEPARATOR,
};

/// Checks that `name` can be stored as one tag segment and returns it trimmed.
fn validate_tag_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let invalid = |reason| ReportDbError::InvalidTagName {
        name: name.to_string(),
        reason,
    };

    if trimmed.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if trimmed.contains(PATH_SEPARATOR) {
        return Err(invalid("name cannot contain '/', create the parent tag first"));
    }
    Ok(trimmed)
}

impl ReportService {
    /// Creates a tag, optionally under `parent`.
    ///
    /// # Errors
    ///
    /// - `InvalidTagName` if the name is empty or contains `/`
    /// - `InvalidParent` if `parent` does not exist
    /// - `DuplicateTag` if a sibling already uses the name
    pub fn create_tag(&self, name: &str, parent: Option<TagId>) -> Result<TagId> {
        let name = validate_tag_name(name)?;
        let tx = self.db.transaction()?;
        let tree = load_tree(&tx)?;

        if let Some(parent) = parent
            && !tree.contains(parent)
        {
            return Err(ReportDbError::InvalidParent { parent });
        }
        if tree.child_named(parent, name).is_some() {
            return Err(ReportDbError::DuplicateTag {
                name: name.to_string(),
                parent,
            });
        }

        tx.execute(
            "INSERT INTO tags (name, parent_id) VALUES (?1, ?2)",
            rusqlite::params![name, parent.map(TagId::get)],
        )?;
        let id = TagId::new(tx.last_insert_rowid());
        tx.commit()?;

        log::info!("created tag {id} '{name}' under {parent:?}");
        Ok(id)
    }

    /// Moves `tag` under `new_parent`, or to the root level when `None`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either tag is unknown
    /// - `CycleDetected` if `new_parent` is `tag` or one of its descendants
    /// - `DuplicateTag` if the new scope already has a tag with this name
    pub fn set_parent(&self, tag: TagId, new_parent: Option<TagId>) -> Result<()> {
        let tx = self.db.transaction()?;
        let tree = load_tree(&tx)?;

        let moved = tree.get(tag).ok_or_else(|| ReportDbError::tag_not_found(tag))?;
        if let Some(parent) = new_parent {
            if !tree.contains(parent) {
                return Err(ReportDbError::tag_not_found(parent));
            }
            if tree.descendants(tag).contains(&parent) {
                return Err(ReportDbError::CycleDetected { tag, parent });
            }
        }
        if moved.parent_id() == new_parent {
            return Ok(());
        }
        if tree.child_named(new_parent, moved.name()).is_some() {
            return Err(ReportDbError::DuplicateTag {
                name: moved.name().to_string(),
                parent: new_parent,
            });
        }

        tx.execute(
            "UPDATE tags SET parent_id = ?1 WHERE id = ?2",
            rusqlite::params![new_parent.map(TagId::get), tag.get()],
        )?;
        tx.commit()?;

        log::info!("moved tag {tag} under {new_parent:?}");
        Ok(())
    }

    /// Deletes a tag and returns the removed ids, children before parents.
    ///
    /// Without `cascade` a tag that still has children is rejected with
    /// `HasChildren`. With `cascade` the whole subtree goes, together with
    /// every report association that referenced any of it. Reports
    /// themselves are never deleted.
    pub fn delete_tag(&self, tag: TagId, cascade: bool) -> Result<Vec<TagId>> {
        let tx = self.db.transaction()?;
        let tree = load_tree(&tx)?;

        let target = tree.get(tag).ok_or_else(|| ReportDbError::tag_not_found(tag))?;
        let children = tree.children_of(tag).len();
        if children > 0 && !cascade {
            return Err(ReportDbError::HasChildren {
                tag,
                name: target.name().to_string(),
                children,
            });
        }

        let doomed = tree.subtree_post_order(tag);
        {
            let mut unlink = tx.prepare("DELETE FROM report_tags WHERE tag_id = ?1")?;
            let mut remove = tx.prepare("DELETE FROM tags WHERE id = ?1")?;
            for id in &doomed {
                unlink.execute([id.get()])?;
                remove.execute([id.get()])?;
            }
        }
        tx.commit()?;

        log::info!(
            "deleted tag {tag} '{}' ({} tag(s) removed)",
            target.name(),
            doomed.len()
        );
        Ok(doomed)
    }

    /// Returns `tag` plus every transitive child.
    pub fn resolve_descendants(&self, tag: TagId) -> Result<BTreeSet<TagId>> {
        let tree = load_tree(self.db.connection())?;
        if !tree.contains(tag) {
            return Err(ReportDbError::tag_not_found(tag));
        }
        Ok(tree.descendants(tag))
    }

    /// Returns the tag forest for display, children ordered by name then id.
    pub fn list_tree(&self) -> Result<Vec<TagNode>> {
        Ok(self.tag_tree()?.forest())
    }

    /// Snapshot of the whole hierarchy for callers that need several lookups
    /// (paths, children) without going back to the database each time.
    pub fn tag_tree(&self) -> Result<TagTree> {
        load_tree(self.db.connection())
    }

    /// Returns every tag ordered by name then id.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .db
            .connection()
            .prepare("SELECT id, name, parent_id FROM tags ORDER BY name, id")?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let parent_id: Option<i64> = row.get(2)?;
            Ok(Tag::with_parent(TagId::new(id), name, parent_id.map(TagId::new)))
        })?;

        let mut tags = Vec::new();
        for row_result in rows {
            tags.push(row_result?);
        }
        Ok(tags)
    }

    /// Fetches one tag by id.
    pub fn get_tag(&self, id: TagId) -> Result<Tag> {
        self.db
            .connection()
            .query_row(
                "SELECT id, name, parent_id FROM tags WHERE id = ?1",
                [id.get()],
                |row| {
                    let id: i64 = row.get(0)?;
                    let name: String = row.get(1)?;
                    let parent_id: Option<i64> = row.get(2)?;
                    Ok(Tag::with_parent(TagId::new(id), name, parent_id.map(TagId::new)))
                },
            )
            .optional()?
            .ok_or_else(|| ReportDbError::tag_not_found(id))
    }

    /// Resolves a tag reference.
    ///
    /// A reference containing `/` is a path from a root tag; a bare name must
    /// match exactly one tag in any scope. `/name` picks the top-level tag
    /// when nested tags share its name.
    ///
    /// # Errors
    ///
    /// - `UnknownTag` if nothing matches
    /// - `AmbiguousTag` if a bare name exists under several parents
    pub fn resolve_tag(&self, reference: &str) -> Result<TagId> {
        let tree = load_tree(self.db.connection())?;
        let id = resolve_reference(&tree, reference)?;
        log::debug!("resolved tag reference '{reference}' to {id}");
        Ok(id)
    }

    /// Returns the slash path of a tag, e.g. `財報/收入`.
    pub fn tag_path(&self, id: TagId) -> Result<String> {
        load_tree(self.db.connection())?
            .path_of(id)
            .ok_or_else(|| ReportDbError::tag_not_found(id))
    }
}
