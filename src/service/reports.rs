//! Report store: report records and their tag associations.

use rusqlite::Connection;

use super::{
    ListReportsOptions, ReportChanges, ReportService, load_report, load_tree, now_timestamp,
    report_exists, resolve_references,
};
use crate::{
    Report, ReportId, TagId,
    error::{ReportDbError, Result},
};

fn insert_associations(conn: &Connection, report: ReportId, tags: &[TagId]) -> Result<()> {
    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO report_tags (report_id, tag_id) VALUES (?1, ?2)")?;
    for tag in tags {
        stmt.execute([report.get(), tag.get()])?;
    }
    Ok(())
}

impl ReportService {
    /// Creates a report tagged with the given tag references.
    ///
    /// Tags are not created on the fly: every reference must already resolve.
    ///
    /// # Errors
    ///
    /// - `UnknownTag` / `AmbiguousTag` if a reference does not resolve
    ///
    /// # Examples
    ///
    /// ```
    /// use reportdb::{Database, ReportService};
    ///
    /// # fn main() -> reportdb::Result<()> {
    /// let service = ReportService::new(Database::in_memory()?);
    /// service.create_tag("weekly", None)?;
    ///
    /// let id = service.add_report("Week 14", "All quiet.", &["weekly"])?;
    /// let report = service.get_report(id)?;
    /// assert_eq!(report.tags()[0].name(), "weekly");
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_report(
        &self,
        title: &str,
        content: &str,
        tags: &[&str],
    ) -> Result<ReportId> {
        self.insert_report(title, content, None, tags)
    }

    pub(crate) fn insert_report(
        &self,
        title: &str,
        content: &str,
        source_path: Option<&str>,
        tags: &[&str],
    ) -> Result<ReportId> {
        let tx = self.db.transaction()?;
        let tree = load_tree(&tx)?;
        let tag_ids = resolve_references(&tree, tags)?;
        let now = now_timestamp();

        tx.execute(
            "INSERT INTO reports (title, content, source_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![title, content, source_path, now],
        )?;
        let id = ReportId::new(tx.last_insert_rowid());
        insert_associations(&tx, id, &tag_ids)?;
        tx.commit()?;

        log::info!("added report {id} '{title}' with {} tag(s)", tag_ids.len());
        Ok(id)
    }

    /// Applies a partial update to a report.
    ///
    /// Only fields set in `changes` are written. A new tag set replaces the
    /// old one entirely. The update timestamp moves only when something was
    /// written.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the report does not exist
    /// - `UnknownTag` / `AmbiguousTag` if a tag reference does not resolve
    pub fn edit_report(&self, id: ReportId, changes: ReportChanges) -> Result<()> {
        let tx = self.db.transaction()?;
        if !report_exists(&tx, id)? {
            return Err(ReportDbError::report_not_found(id));
        }
        if changes.is_empty() {
            return Ok(());
        }

        // Resolve before writing anything so a bad reference changes nothing.
        let tag_ids = match &changes.tags {
            Some(references) => Some(resolve_references(&load_tree(&tx)?, references.as_slice())?),
            None => None,
        };

        if let Some(title) = &changes.title {
            tx.execute(
                "UPDATE reports SET title = ?1 WHERE id = ?2",
                rusqlite::params![title, id.get()],
            )?;
        }
        if let Some(content) = &changes.content {
            tx.execute(
                "UPDATE reports SET content = ?1 WHERE id = ?2",
                rusqlite::params![content, id.get()],
            )?;
        }
        if let Some(source_path) = &changes.source_path {
            tx.execute(
                "UPDATE reports SET source_path = ?1 WHERE id = ?2",
                rusqlite::params![source_path, id.get()],
            )?;
        }
        if let Some(tag_ids) = &tag_ids {
            tx.execute("DELETE FROM report_tags WHERE report_id = ?1", [id.get()])?;
            insert_associations(&tx, id, tag_ids)?;
        }
        tx.execute(
            "UPDATE reports SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![now_timestamp(), id.get()],
        )?;
        tx.commit()?;

        log::info!("edited report {id}");
        Ok(())
    }

    /// Attaches one tag to a report. Assigning a tag twice is a no-op.
    pub fn assign_tag(&self, id: ReportId, tag: &str) -> Result<()> {
        self.assign_tags(id, &[tag])
    }

    /// Attaches several tags at once; either all are attached or none.
    pub fn assign_tags(&self, id: ReportId, tags: &[&str]) -> Result<()> {
        let tx = self.db.transaction()?;
        if !report_exists(&tx, id)? {
            return Err(ReportDbError::report_not_found(id));
        }
        let tag_ids = resolve_references(&load_tree(&tx)?, tags)?;
        insert_associations(&tx, id, &tag_ids)?;
        tx.commit()?;

        log::info!("assigned {} tag(s) to report {id}", tag_ids.len());
        Ok(())
    }

    /// Deletes a report and all of its tag associations.
    pub fn delete_report(&self, id: ReportId) -> Result<()> {
        let tx = self.db.transaction()?;
        tx.execute("DELETE FROM report_tags WHERE report_id = ?1", [id.get()])?;
        let removed = tx.execute("DELETE FROM reports WHERE id = ?1", [id.get()])?;
        if removed == 0 {
            return Err(ReportDbError::report_not_found(id));
        }
        tx.commit()?;

        log::info!("deleted report {id}");
        Ok(())
    }

    /// Fetches a report with its content and tags.
    pub fn get_report(&self, id: ReportId) -> Result<Report> {
        load_report(self.db.connection(), id, true)?
            .ok_or_else(|| ReportDbError::report_not_found(id))
    }

    /// Lists reports by creation time (ties broken by id).
    pub fn list_reports(&self, options: ListReportsOptions) -> Result<Vec<Report>> {
        let conn = self.db.connection();

        let order = options.order.sql();
        let mut query = format!("SELECT id FROM reports ORDER BY created_at {order}, id {order}");
        if let Some(limit) = options.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut ids = Vec::new();
        for row_result in rows {
            ids.push(ReportId::new(row_result?));
        }

        let mut reports = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(report) = load_report(conn, id, options.include_content)? {
                reports.push(report);
            }
        }
        Ok(reports)
    }
}
