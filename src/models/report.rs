use serde::Serialize;
use time::OffsetDateTime;

use super::{ReportId, Tag};

/// A stored report with its text and tag associations.
///
/// When a report comes from a listing that skipped content, `content` is
/// empty and `has_content()` returns false. Reports are built from the
/// database only, so they serialize for output but never deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    id: ReportId,
    title: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_path: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
    tags: Vec<Tag>,
    #[serde(skip)]
    content_loaded: bool,
}

impl Report {
    /// Returns the report's unique identifier.
    pub fn id(&self) -> ReportId {
        self.id
    }

    /// Returns the report title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the stored report text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns false when the report was listed without its content.
    pub fn has_content(&self) -> bool {
        self.content_loaded
    }

    /// Returns the file the report was imported from, if any.
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Returns when the report was created.
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    /// Returns when the report was last modified.
    pub fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }

    /// Returns the tags attached to this report, ordered by name.
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }
}

/// Builder for constructing `Report` instances with optional fields.
///
/// # Examples
///
/// ```
/// use reportdb::{ReportBuilder, ReportId};
///
/// let report = ReportBuilder::new(ReportId::new(1), "April report")
///     .content("Revenue grew.")
///     .build();
///
/// assert_eq!(report.title(), "April report");
/// assert_eq!(report.content(), "Revenue grew.");
/// assert!(report.tags().is_empty());
/// ```
#[derive(Debug)]
pub struct ReportBuilder {
    id: ReportId,
    title: String,
    content: Option<String>,
    source_path: Option<String>,
    created_at: Option<OffsetDateTime>,
    updated_at: Option<OffsetDateTime>,
    tags: Vec<Tag>,
}

impl ReportBuilder {
    /// Creates a builder for the report with the given id and title.
    pub fn new(id: ReportId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: None,
            source_path: None,
            created_at: None,
            updated_at: None,
            tags: Vec::new(),
        }
    }

    /// Sets the report content.
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the import source path.
    pub fn source_path(mut self, source_path: Option<String>) -> Self {
        self.source_path = source_path;
        self
    }

    /// Sets the created timestamp.
    pub fn created_at(mut self, created_at: OffsetDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the updated timestamp.
    pub fn updated_at(mut self, updated_at: OffsetDateTime) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Sets the attached tags.
    pub fn tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    /// Builds the `Report`. Missing timestamps default to now; a report
    /// built without content is marked as a content-less listing entry.
    pub fn build(self) -> Report {
        let now = OffsetDateTime::now_utc();
        let created_at = self.created_at.unwrap_or(now);
        Report {
            id: self.id,
            title: self.title,
            content_loaded: self.content.is_some(),
            content: self.content.unwrap_or_default(),
            source_path: self.source_path,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at),
            tags: self.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TagId;

    #[test]
    fn builder_without_content_marks_report_as_summary() {
        let report = ReportBuilder::new(ReportId::new(1), "Summary only").build();

        assert_eq!(report.content(), "");
        assert!(!report.has_content());
    }

    #[test]
    fn builder_allows_setting_all_fields() {
        let now = OffsetDateTime::from_unix_timestamp(1_714_000_000).unwrap();
        let later = OffsetDateTime::from_unix_timestamp(1_714_000_600).unwrap();
        let tag = Tag::new(TagId::new(3), "finance");

        let report = ReportBuilder::new(ReportId::new(9), "Full")
            .content("body")
            .source_path(Some("/tmp/full.txt".to_string()))
            .created_at(now)
            .updated_at(later)
            .tags(vec![tag.clone()])
            .build();

        assert_eq!(report.id(), ReportId::new(9));
        assert!(report.has_content());
        assert_eq!(report.source_path(), Some("/tmp/full.txt"));
        assert_eq!(report.created_at(), now);
        assert_eq!(report.updated_at(), later);
        assert_eq!(report.tags(), &[tag]);
    }

    #[test]
    fn updated_at_defaults_to_created_at() {
        let created = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let report = ReportBuilder::new(ReportId::new(1), "t")
            .created_at(created)
            .build();

        assert_eq!(report.updated_at(), created);
    }

    #[test]
    fn json_uses_rfc3339_timestamps_and_omits_missing_source() {
        let created = OffsetDateTime::from_unix_timestamp(0).unwrap();
        let report = ReportBuilder::new(ReportId::new(1), "t")
            .content("c")
            .created_at(created)
            .build();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert!(json.get("source_path").is_none());
    }

    #[test]
    fn json_output_does_not_expose_content_flag() {
        let summary = ReportBuilder::new(ReportId::new(2), "listed").build();

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["content"], "");
        assert!(json.get("content_loaded").is_none());
        assert!(!summary.has_content());
    }
}
