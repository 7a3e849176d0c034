use std::path::{Path, PathBuf};

use crate::models::{Report, ReportId, Tag, TagId, TagTree};

/// One visible line of the tag tree panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub id: TagId,
    pub name: String,
    pub depth: usize,
    pub has_children: bool,
}

/// Flattens the forest into display rows, parents before children.
pub fn flatten_tree(tree: &TagTree) -> Vec<TagRow> {
    let mut rows = Vec::with_capacity(tree.len());
    let mut pending: Vec<(TagId, usize)> = tree.roots().iter().rev().map(|&id| (id, 0)).collect();

    while let Some((id, depth)) = pending.pop() {
        let Some(tag) = tree.get(id) else {
            continue;
        };
        let children = tree.children_of(id);
        rows.push(TagRow {
            id,
            name: tag.name().to_string(),
            depth,
            has_children: !children.is_empty(),
        });
        pending.extend(children.iter().rev().map(|&child| (child, depth + 1)));
    }
    rows
}

/// Application state for the browser.
///
/// Holds the tag tree, the report list for the current filter, the fully
/// loaded report shown in the detail panel and which panel has focus.
#[derive(Debug, Clone, Default)]
pub struct App {
    tree: TagTree,
    tag_rows: Vec<TagRow>,
    selected_tag: Option<usize>,
    /// Reports for the current filter, loaded without content
    reports: Vec<Report>,
    selected_report: Option<usize>,
    /// Tag the list is filtered by, with its path; None lists every report
    filter: Option<(TagId, String)>,
    /// Full copy of the selected report
    detail: Option<Report>,
    detail_scroll: u16,
    focus: Focus,
    status: Option<String>,
    /// Destructive action waiting for a yes/no answer
    confirm: Option<Confirm>,
    /// Exports land here as `report-<id>.txt`; empty means the working directory
    export_dir: PathBuf,
}

/// Panel focus state for keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Tag tree panel (j/k to move, Enter to filter)
    #[default]
    TagTree,
    /// Report list panel (j/k to move, selection opens the report)
    ReportList,
    /// Detail panel (j/k to scroll)
    Detail,
}

/// Follow-up work an event asks the event loop to perform against the
/// database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    /// Show reports under this tag and its descendants
    FilterByTag(TagId),
    /// Drop the filter and list every report
    ShowAll,
    /// Load the full report into the detail panel
    OpenReport(ReportId),
    /// Remove a tag; `cascade` takes its descendants along
    DeleteTag { tag: TagId, cascade: bool },
    DeleteReport(ReportId),
    /// Write the report content to the export directory
    Export(ReportId),
}

/// A delete the user still has to confirm with `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    DeleteTag {
        tag: TagId,
        path: String,
        cascade: bool,
    },
    DeleteReport {
        id: ReportId,
        title: String,
    },
}

impl Confirm {
    /// Question shown in the bottom bar.
    pub fn prompt(&self) -> String {
        match self {
            Confirm::DeleteTag {
                path,
                cascade: true,
                ..
            } => format!("Delete tag '{path}' and all of its sub-tags? (y/n)"),
            Confirm::DeleteTag { path, .. } => format!("Delete tag '{path}'? (y/n)"),
            Confirm::DeleteReport { id, title } => {
                format!("Delete report '{title}' (#{id})? (y/n)")
            }
        }
    }

    /// The action a `y` answer carries out.
    pub fn action(&self) -> Action {
        match *self {
            Confirm::DeleteTag { tag, cascade, .. } => Action::DeleteTag { tag, cascade },
            Confirm::DeleteReport { id, .. } => Action::DeleteReport(id),
        }
    }
}

fn wrap_next(current: Option<usize>, len: usize) -> Option<usize> {
    match (current, len) {
        (_, 0) => None,
        (None, _) => Some(0),
        (Some(i), len) if i + 1 >= len => Some(0),
        (Some(i), _) => Some(i + 1),
    }
}

fn wrap_previous(current: Option<usize>, len: usize) -> Option<usize> {
    match (current, len) {
        (_, 0) => None,
        (None | Some(0), len) => Some(len - 1),
        (Some(i), _) => Some(i - 1),
    }
}

impl App {
    /// Creates an empty App focused on the tag tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use reportdb::tui::{App, Focus};
    ///
    /// let app = App::new();
    /// assert!(app.reports().is_empty());
    /// assert_eq!(app.focus(), Focus::TagTree);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the tag tree, keeping the selection on the same tag when it
    /// still exists.
    pub fn set_tree(&mut self, tree: TagTree) {
        let previous = self.selected_tag().map(|row| row.id);
        self.tag_rows = flatten_tree(&tree);
        self.tree = tree;
        self.selected_tag = previous
            .and_then(|id| self.tag_rows.iter().position(|row| row.id == id))
            .or(if self.tag_rows.is_empty() { None } else { Some(0) });
    }

    pub fn tag_rows(&self) -> &[TagRow] {
        &self.tag_rows
    }

    pub fn selected_tag_index(&self) -> Option<usize> {
        self.selected_tag
    }

    pub fn selected_tag(&self) -> Option<&TagRow> {
        self.selected_tag.and_then(|i| self.tag_rows.get(i))
    }

    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tree.contains(tag)
    }

    /// Slash path of a tag, falling back to its bare name.
    pub fn tag_label(&self, tag: &Tag) -> String {
        self.tree
            .path_of(tag.id())
            .unwrap_or_else(|| tag.name().to_string())
    }

    /// Shows a new report list and selects its first entry.
    ///
    /// `filter` is the tag the list was narrowed to, with its display path.
    pub fn set_reports(&mut self, reports: Vec<Report>, filter: Option<(TagId, String)>) {
        self.selected_report = if reports.is_empty() { None } else { Some(0) };
        self.reports = reports;
        self.filter = filter;
        self.detail = None;
        self.detail_scroll = 0;
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn selected_report_index(&self) -> Option<usize> {
        self.selected_report
    }

    pub fn selected_report(&self) -> Option<&Report> {
        self.selected_report.and_then(|i| self.reports.get(i))
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_ref().map(|(_, path)| path.as_str())
    }

    pub fn filter_tag(&self) -> Option<TagId> {
        self.filter.as_ref().map(|(tag, _)| *tag)
    }

    pub fn set_detail(&mut self, report: Option<Report>) {
        self.detail = report;
        self.detail_scroll = 0;
    }

    pub fn detail(&self) -> Option<&Report> {
        self.detail.as_ref()
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Order: `TagTree` -> `ReportList` -> `Detail` -> `TagTree`
    pub fn next_focus(&mut self) {
        self.focus = match self.focus {
            Focus::TagTree => Focus::ReportList,
            Focus::ReportList => Focus::Detail,
            Focus::Detail => Focus::TagTree,
        };
    }

    pub fn prev_focus(&mut self) {
        self.focus = match self.focus {
            Focus::TagTree => Focus::Detail,
            Focus::ReportList => Focus::TagTree,
            Focus::Detail => Focus::ReportList,
        };
    }

    /// Returns focus to the tag tree (Esc key behavior).
    pub fn reset_focus(&mut self) {
        self.focus = Focus::TagTree;
    }

    /// Moves down the tag tree, wrapping to the top.
    pub fn select_next_tag(&mut self) {
        self.selected_tag = wrap_next(self.selected_tag, self.tag_rows.len());
    }

    /// Moves up the tag tree, wrapping to the bottom.
    pub fn select_previous_tag(&mut self) {
        self.selected_tag = wrap_previous(self.selected_tag, self.tag_rows.len());
    }

    /// Moves down the report list and returns the newly selected report.
    pub fn select_next_report(&mut self) -> Option<ReportId> {
        self.selected_report = wrap_next(self.selected_report, self.reports.len());
        self.selected_report().map(Report::id)
    }

    /// Moves up the report list and returns the newly selected report.
    pub fn select_previous_report(&mut self) -> Option<ReportId> {
        self.selected_report = wrap_previous(self.selected_report, self.reports.len());
        self.selected_report().map(Report::id)
    }

    pub fn detail_scroll(&self) -> u16 {
        self.detail_scroll
    }

    pub fn scroll_detail_down(&mut self, amount: u16) {
        self.detail_scroll = self.detail_scroll.saturating_add(amount);
    }

    pub fn scroll_detail_up(&mut self, amount: u16) {
        self.detail_scroll = self.detail_scroll.saturating_sub(amount);
    }

    /// Message shown in the bottom bar instead of the shortcuts.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// Asks to delete the selected tag. A tag with children is deleted
    /// together with its subtree.
    pub fn request_delete_tag(&mut self) {
        let Some(row) = self.selected_tag() else {
            return;
        };
        let (tag, cascade) = (row.id, row.has_children);
        let path = self.tree.path_of(tag).unwrap_or_else(|| row.name.clone());
        self.confirm = Some(Confirm::DeleteTag { tag, path, cascade });
    }

    /// Asks to delete the selected report.
    pub fn request_delete_report(&mut self) {
        let Some(report) = self.selected_report() else {
            return;
        };
        let confirm = Confirm::DeleteReport {
            id: report.id(),
            title: report.title().to_string(),
        };
        self.confirm = Some(confirm);
    }

    pub fn pending_confirm(&self) -> Option<&Confirm> {
        self.confirm.as_ref()
    }

    pub fn take_confirm(&mut self) -> Option<Confirm> {
        self.confirm.take()
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    pub fn set_export_dir(&mut self, dir: impl Into<PathBuf>) {
        self.export_dir = dir.into();
    }

    /// Destination file for exporting `id`.
    pub fn export_path(&self, id: ReportId) -> PathBuf {
        self.export_dir.join(format!("report-{id}.txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportBuilder;

    fn sample_tree() -> TagTree {
        // 財報(1) -> 收入(2), 支出(3); ops(4)
        TagTree::from_tags([
            Tag::new(TagId::new(1), "財報"),
            Tag::with_parent(TagId::new(2), "收入", Some(TagId::new(1))),
            Tag::with_parent(TagId::new(3), "支出", Some(TagId::new(1))),
            Tag::new(TagId::new(4), "ops"),
        ])
    }

    fn reports(n: i64) -> Vec<Report> {
        (1..=n)
            .map(|i| ReportBuilder::new(ReportId::new(i), format!("Report {i}")).build())
            .collect()
    }

    #[test]
    fn flatten_tree_lists_parents_before_children() {
        let rows = flatten_tree(&sample_tree());
        let listed: Vec<(&str, usize)> = rows.iter().map(|r| (r.name.as_str(), r.depth)).collect();

        // Siblings are ordered by name: "ops" sorts before "財報".
        assert_eq!(
            listed,
            vec![("ops", 0), ("財報", 0), ("支出", 1), ("收入", 1)]
        );
        assert!(rows[1].has_children);
        assert!(!rows[2].has_children);
    }

    #[test]
    fn flatten_tree_handles_deep_chains() {
        let mut tags = vec![Tag::new(TagId::new(1), "t1")];
        for i in 2..=20_000 {
            tags.push(Tag::with_parent(TagId::new(i), format!("t{i}"), Some(TagId::new(i - 1))));
        }
        let rows = flatten_tree(&TagTree::from_tags(tags));

        assert_eq!(rows.len(), 20_000);
        assert_eq!(rows.last().map(|r| r.depth), Some(19_999));
    }

    #[test]
    fn set_tree_selects_first_row_and_keeps_selection_on_reload() {
        let mut app = App::new();
        app.set_tree(sample_tree());
        assert_eq!(app.selected_tag().map(|r| r.name.as_str()), Some("ops"));

        app.select_next_tag();
        assert_eq!(app.selected_tag().map(|r| r.id), Some(TagId::new(1)));

        app.set_tree(sample_tree());
        assert_eq!(app.selected_tag().map(|r| r.id), Some(TagId::new(1)));
    }

    #[test]
    fn tag_selection_wraps_both_ways() {
        let mut app = App::new();
        app.set_tree(sample_tree());

        app.select_previous_tag();
        assert_eq!(app.selected_tag_index(), Some(3));

        app.select_next_tag();
        assert_eq!(app.selected_tag_index(), Some(0));
    }

    #[test]
    fn report_selection_returns_selected_id() {
        let mut app = App::new();
        app.set_reports(reports(2), None);
        assert_eq!(app.selected_report_index(), Some(0));

        assert_eq!(app.select_next_report(), Some(ReportId::new(2)));
        assert_eq!(app.select_next_report(), Some(ReportId::new(1)));
        assert_eq!(app.select_previous_report(), Some(ReportId::new(2)));
    }

    #[test]
    fn empty_lists_have_no_selection() {
        let mut app = App::new();
        app.set_reports(Vec::new(), Some((TagId::new(1), "財報".to_string())));

        assert_eq!(app.select_next_report(), None);
        assert_eq!(app.select_previous_report(), None);
        app.select_next_tag();
        assert_eq!(app.selected_tag_index(), None);
        assert_eq!(app.filter(), Some("財報"));
        assert_eq!(app.filter_tag(), Some(TagId::new(1)));
    }

    #[test]
    fn set_reports_clears_detail() {
        let mut app = App::new();
        app.set_detail(reports(1).pop());
        app.scroll_detail_down(5);

        app.set_reports(reports(3), None);
        assert!(app.detail().is_none());
        assert_eq!(app.detail_scroll(), 0);
    }

    #[test]
    fn focus_cycles_in_both_directions() {
        let mut app = App::new();
        app.next_focus();
        assert_eq!(app.focus(), Focus::ReportList);
        app.next_focus();
        assert_eq!(app.focus(), Focus::Detail);
        app.next_focus();
        assert_eq!(app.focus(), Focus::TagTree);

        app.prev_focus();
        assert_eq!(app.focus(), Focus::Detail);
        app.reset_focus();
        assert_eq!(app.focus(), Focus::TagTree);
    }

    #[test]
    fn detail_scroll_saturates_at_zero() {
        let mut app = App::new();
        app.scroll_detail_down(2);
        app.scroll_detail_up(5);
        assert_eq!(app.detail_scroll(), 0);
    }

    #[test]
    fn delete_request_on_parent_tag_cascades() {
        let mut app = App::new();
        app.set_tree(sample_tree());
        app.select_next_tag();
        assert_eq!(app.selected_tag().map(|r| r.id), Some(TagId::new(1)));

        app.request_delete_tag();
        let confirm = app.pending_confirm().cloned().unwrap();
        assert!(confirm.prompt().contains("財報"));
        assert!(confirm.prompt().contains("sub-tags"));
        assert_eq!(
            confirm.action(),
            Action::DeleteTag {
                tag: TagId::new(1),
                cascade: true
            }
        );

        // A leaf is deleted on its own
        app.take_confirm();
        app.select_next_tag();
        app.request_delete_tag();
        assert_eq!(
            app.pending_confirm().map(Confirm::action),
            Some(Action::DeleteTag {
                tag: TagId::new(3),
                cascade: false
            })
        );
    }

    #[test]
    fn delete_request_without_selection_does_nothing() {
        let mut app = App::new();
        app.request_delete_tag();
        app.request_delete_report();
        assert!(app.pending_confirm().is_none());
    }

    #[test]
    fn delete_report_request_names_the_report() {
        let mut app = App::new();
        app.set_reports(reports(2), None);
        app.select_next_report();

        app.request_delete_report();
        let confirm = app.take_confirm().unwrap();
        assert_eq!(confirm.prompt(), "Delete report 'Report 2' (#2)? (y/n)");
        assert_eq!(confirm.action(), Action::DeleteReport(ReportId::new(2)));
        assert!(app.pending_confirm().is_none());
    }

    #[test]
    fn export_path_uses_export_dir() {
        let mut app = App::new();
        assert_eq!(app.export_path(ReportId::new(4)), PathBuf::from("report-4.txt"));

        app.set_export_dir("/tmp/out");
        assert_eq!(
            app.export_path(ReportId::new(4)),
            PathBuf::from("/tmp/out/report-4.txt")
        );
    }

    #[test]
    fn tag_label_uses_full_path() {
        let mut app = App::new();
        app.set_tree(sample_tree());

        let revenue = Tag::with_parent(TagId::new(2), "收入", Some(TagId::new(1)));
        assert_eq!(app.tag_label(&revenue), "財報/收入");

        let unknown = Tag::new(TagId::new(99), "gone");
        assert_eq!(app.tag_label(&unknown), "gone");
    }
}
