use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::{
    Database, Report, ReportBuilder, ReportId, Tag, TagId, TagTree,
    error::{ReportDbError, Result},
};

mod reports;
mod search;
mod tags;
mod transfer;

/// Service layer providing report and tag management operations.
///
/// ReportService owns a Database instance and hosts the tag store, the
/// report store, tag search and file import/export. It is UI-independent
/// and backs both the CLI and the terminal browser.
///
/// Every mutating operation runs in its own transaction: on error nothing
/// is written.
///
/// # Examples
///
/// ```
/// use reportdb::{Database, ReportService};
///
/// # fn main() -> reportdb::Result<()> {
/// let db = Database::in_memory()?;
/// let service = ReportService::new(db);
///
/// let finance = service.create_tag("財報", None)?;
/// service.create_tag("收入", Some(finance))?;
/// let id = service.add_report("四月月報", "revenue up", &["財報/收入"])?;
///
/// let hits = service.search(&["財報"])?;
/// assert_eq!(hits[0].id(), id);
/// # Ok(())
/// # }
/// ```
pub struct ReportService {
    db: Database,
}

impl ReportService {
    /// Creates a new ReportService with the given database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    ///
    /// Useful for testing or advanced operations that need direct database access.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

/// Sort order for listing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest reports first (ascending by creation time)
    Ascending,
    /// Newest reports first (descending by creation time)
    #[default]
    Descending,
}

impl SortOrder {
    fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// Options for listing reports.
///
/// # Examples
///
/// ```
/// use reportdb::ListReportsOptions;
///
/// // Titles and metadata only, newest first
/// let options = ListReportsOptions::default();
/// assert!(!options.include_content);
///
/// let options = ListReportsOptions {
///     include_content: true,
///     limit: Some(10),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListReportsOptions {
    /// Load the full report text. Off by default since listings only show
    /// titles.
    pub include_content: bool,

    /// Maximum number of reports to return. None means no limit.
    pub limit: Option<usize>,

    /// Sort order by creation time. Defaults to Descending (newest first).
    pub order: SortOrder,
}

/// Partial update for [`ReportService::edit_report`].
///
/// `None` leaves a field unchanged. `tags: Some(..)` replaces the whole tag
/// set; `Some(vec![])` clears it. `source_path: Some(None)` forgets where
/// the content was imported from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub source_path: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl ReportChanges {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.source_path.is_none()
            && self.tags.is_none()
    }
}

fn now_timestamp() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Loads every tag into the in-memory tree.
pub(crate) fn load_tree(conn: &Connection) -> Result<TagTree> {
    let mut stmt = conn.prepare("SELECT id, name, parent_id FROM tags")?;
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
    Ok(TagTree::from_tags(tags))
}

/// Resolves a tag reference (bare name or slash path) against `tree`.
pub(crate) fn resolve_reference(tree: &TagTree, reference: &str) -> Result<TagId> {
    let trimmed = reference.trim();
    let unknown = || ReportDbError::UnknownTag {
        name: reference.to_string(),
    };

    if trimmed.contains(crate::models::PATH_SEPARATOR) {
        return tree.find_by_path(trimmed).ok_or_else(unknown);
    }

    let matches = tree.find_by_name(trimmed);
    match matches.as_slice() {
        [] => Err(unknown()),
        [only] => Ok(*only),
        many => Err(ReportDbError::AmbiguousTag {
            name: trimmed.to_string(),
            candidates: many
                .iter()
                .filter_map(|id| unambiguous_reference(tree, *id))
                .collect(),
        }),
    }
}

/// A reference that resolves to exactly `id`. Top-level tags get a leading
/// `/` so they never read as a bare name.
fn unambiguous_reference(tree: &TagTree, id: TagId) -> Option<String> {
    let tag = tree.get(id)?;
    match tag.parent_id() {
        None => Some(format!("{}{}", crate::models::PATH_SEPARATOR, tag.name())),
        Some(_) => tree.path_of(id),
    }
}

/// Resolves a list of references, dropping duplicates while keeping the
/// first-seen order.
pub(crate) fn resolve_references<S: AsRef<str>>(
    tree: &TagTree,
    references: &[S],
) -> Result<Vec<TagId>> {
    let mut ids = Vec::with_capacity(references.len());
    for reference in references {
        let id = resolve_reference(tree, reference.as_ref())?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

pub(crate) fn report_exists(conn: &Connection, id: ReportId) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM reports WHERE id = ?1)",
        [id.get()],
        |row| row.get(0),
    )?)
}

/// Tags attached to a report, ordered by name then id.
pub(crate) fn tags_for_report(conn: &Connection, id: ReportId) -> Result<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.parent_id
         FROM tags t
         JOIN report_tags rt ON rt.tag_id = t.id
         WHERE rt.report_id = ?1
         ORDER BY t.name, t.id",
    )?;
    let rows = stmt.query_map([id.get()], |row| {
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

/// Loads one report with its tags. `include_content` false leaves the
/// content out of the result.
pub(crate) fn load_report(
    conn: &Connection,
    id: ReportId,
    include_content: bool,
) -> Result<Option<Report>> {
    let row = conn
        .query_row(
            "SELECT id, title, CASE WHEN ?2 THEN content ELSE NULL END, source_path, created_at, updated_at
             FROM reports WHERE id = ?1",
            rusqlite::params![id.get(), include_content],
            |row| {
                let id: i64 = row.get(0)?;
                let title: String = row.get(1)?;
                let content: Option<String> = row.get(2)?;
                let source_path: Option<String> = row.get(3)?;
                let created_at: i64 = row.get(4)?;
                let updated_at: i64 = row.get(5)?;
                Ok((id, title, content, source_path, created_at, updated_at))
            },
        )
        .optional()?;

    let Some((id, title, content, source_path, created_at, updated_at)) = row else {
        return Ok(None);
    };

    let report_id = ReportId::new(id);
    let mut builder = ReportBuilder::new(report_id, title)
        .source_path(source_path)
        .created_at(OffsetDateTime::from_unix_timestamp(created_at)?)
        .updated_at(OffsetDateTime::from_unix_timestamp(updated_at)?)
        .tags(tags_for_report(conn, report_id)?);
    if let Some(content) = content {
        builder = builder.content(content);
    }

    Ok(Some(builder.build()))
}
