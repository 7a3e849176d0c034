//! Tag search: a report matches when any of its tags lies in the closure
//! of any requested tag.

use std::collections::BTreeSet;

use rusqlite::Connection;

use super::{ReportService, load_report, load_tree, resolve_references};
use crate::{Report, ReportId, TagId, error::Result};

/// Report ids associated with any tag in `tags`, ascending.
fn reports_tagged_with(conn: &Connection, tags: &BTreeSet<TagId>) -> Result<Vec<ReportId>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: Vec<&str> = tags.iter().map(|_| "?").collect();
    let query = format!(
        "SELECT DISTINCT report_id FROM report_tags WHERE tag_id IN ({}) ORDER BY report_id",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(tags.iter().map(|t| t.get())),
        |row| row.get::<_, i64>(0),
    )?;

    let mut ids = Vec::new();
    for row_result in rows {
        ids.push(ReportId::new(row_result?));
    }
    Ok(ids)
}

impl ReportService {
    /// Finds reports tagged with any of `tags` or any of their descendants.
    ///
    /// Results are deduplicated and ordered by report id. An empty request
    /// matches nothing.
    ///
    /// # Errors
    ///
    /// - `UnknownTag` / `AmbiguousTag` if any reference does not resolve
    pub fn search(&self, tags: &[&str]) -> Result<Vec<Report>> {
        let conn = self.db.connection();
        let closure = self.search_closure(tags)?;

        let mut reports = Vec::new();
        for id in reports_tagged_with(conn, &closure)? {
            if let Some(report) = load_report(conn, id, true)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Reports tagged with `tag` or one of its descendants, by report id.
    ///
    /// Titles and tags only; the content is left out.
    pub fn reports_under(&self, tag: TagId) -> Result<Vec<Report>> {
        let conn = self.db.connection();
        let closure = self.resolve_descendants(tag)?;

        let mut reports = Vec::new();
        for id in reports_tagged_with(conn, &closure)? {
            if let Some(report) = load_report(conn, id, false)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Union of the descendant closures of every requested tag.
    pub fn search_closure(&self, tags: &[&str]) -> Result<BTreeSet<TagId>> {
        let tree = load_tree(self.db.connection())?;
        let roots = resolve_references(&tree, tags)?;

        let mut closure = BTreeSet::new();
        for root in roots {
            closure.extend(tree.descendants(root));
        }
        log::debug!(
            "search closure for {} tag(s) spans {} tag(s)",
            tags.len(),
            closure.len()
        );
        Ok(closure)
    }
}
