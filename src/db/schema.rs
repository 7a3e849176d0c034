/// Complete database schema for the report store.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// All statements are designed to be run in a single batch.
pub const INITIAL_SCHEMA: &str = r#"
-- Reports table: title, full text and Unix-second timestamps
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    source_path TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Tags table: self-referential parent pointer forms the tag forest
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent_id INTEGER,
    FOREIGN KEY (parent_id) REFERENCES tags(id)
);

-- Junction table: links reports to tags (many-to-many)
CREATE TABLE IF NOT EXISTS report_tags (
    report_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    PRIMARY KEY (report_id, tag_id),
    FOREIGN KEY (report_id) REFERENCES reports(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);

-- Names are unique within one parent scope (roots share scope 0)
CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_scope_name ON tags(COALESCE(parent_id, 0), name);

-- Child lookups while walking the hierarchy
CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_id);

-- Index for sorting reports by creation date
CREATE INDEX IF NOT EXISTS idx_reports_created ON reports(created_at);

-- Reverse lookup from tag to reports (forward lookup uses the primary key)
CREATE INDEX IF NOT EXISTS idx_report_tags_tag ON report_tags(tag_id);
"#;
