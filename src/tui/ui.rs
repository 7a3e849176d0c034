//! UI rendering for the browser.
//!
//! Three panels side by side (tag tree, report list, report detail) above a
//! one-line bar showing shortcuts or the last status message.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use super::app::{App, Focus};
use crate::utils::format_timestamp;

/// Draws the whole screen for the current app state.
pub fn draw(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25), // Tag tree
            Constraint::Percentage(30), // Report list
            Constraint::Percentage(45), // Detail
        ])
        .split(main_chunks[0]);

    render_tag_tree(frame, app, panels[0]);
    render_report_list(frame, app, panels[1]);
    render_detail(frame, app, panels[2]);
    render_bottom_bar(frame, app, main_chunks[1]);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style)
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::REVERSED)
}

fn render_tag_tree(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block("Tags".to_string(), app.focus() == Focus::TagTree);

    let items: Vec<ListItem> = app
        .tag_rows()
        .iter()
        .map(|row| {
            let marker = if row.has_children { "▸ " } else { "  " };
            ListItem::new(format!("{}{marker}{}", "  ".repeat(row.depth), row.name))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(highlight_style());
    let mut state = ListState::default();
    state.select(app.selected_tag_index());

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_report_list(frame: &mut Frame, app: &App, area: Rect) {
    let title = match app.filter() {
        Some(path) => format!("Reports: {path} ({})", app.reports().len()),
        None => format!("Reports ({})", app.reports().len()),
    };
    let block = panel_block(title, app.focus() == Focus::ReportList);

    let items: Vec<ListItem> = app
        .reports()
        .iter()
        .map(|report| {
            let created = format_timestamp(report.created_at());
            let date = created.split(' ').next().unwrap_or_default().to_string();
            ListItem::new(Line::from(vec![
                Span::raw(report.title().to_string()),
                Span::raw(" "),
                Span::styled(
                    format!("[{date}]"),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(highlight_style());
    let mut state = ListState::default();
    state.select(app.selected_report_index());

    frame.render_stateful_widget(list, area, &mut state);
}

fn labelled(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::styled(value, Style::default().fg(Color::DarkGray)),
    ])
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block("Detail".to_string(), app.focus() == Focus::Detail);

    let content = match app.detail() {
        Some(report) => {
            let mut text = Text::default();
            text.lines.push(Line::from(Span::styled(
                report.title().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            text.lines.push(labelled(
                "Created:",
                format!("{} UTC", format_timestamp(report.created_at())),
            ));
            if report.updated_at() != report.created_at() {
                text.lines.push(labelled(
                    "Updated:",
                    format!("{} UTC", format_timestamp(report.updated_at())),
                ));
            }
            if let Some(source) = report.source_path() {
                text.lines.push(labelled("Source:", source.to_string()));
            }

            let tags: Vec<String> = report.tags().iter().map(|t| app.tag_label(t)).collect();
            let tags = if tags.is_empty() {
                "(none)".to_string()
            } else {
                tags.join(", ")
            };
            text.lines.push(Line::from(vec![
                Span::styled("Tags:", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(tags, Style::default().fg(Color::Cyan)),
            ]));

            text.lines.push(Line::from(""));
            text.lines
                .extend(report.content().lines().map(|l| Line::from(l.to_string())));
            text
        }
        None => Text::from("No report selected"),
    };

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll(), 0));

    frame.render_widget(paragraph, area);
}

/// Shows a pending confirmation, then the status message if there is one,
/// otherwise focus-aware shortcuts in the form `key: action | key: action`.
fn render_bottom_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(confirm) = app.pending_confirm() {
        let line = Line::from(Span::styled(
            confirm.prompt(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    if let Some(status) = app.status() {
        let line = Line::from(Span::styled(
            status.to_string(),
            Style::default().fg(Color::Yellow),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let key_style = Style::default().fg(Color::Cyan);
    let sep_style = Style::default().fg(Color::DarkGray);

    let mut shortcuts = vec![("q", "quit"), ("Tab", "next panel"), ("a", "all reports")];
    match app.focus() {
        Focus::TagTree => {
            shortcuts.push(("j/k", "move"));
            shortcuts.push(("Enter", "filter by tag"));
            shortcuts.push(("d", "delete tag"));
        }
        Focus::ReportList => {
            shortcuts.push(("j/k", "open report"));
            shortcuts.push(("d", "delete"));
            shortcuts.push(("e", "export"));
        }
        Focus::Detail => {
            shortcuts.push(("j/k", "scroll"));
            shortcuts.push(("e", "export"));
        }
    }

    let mut spans = Vec::new();
    for (i, (key, action)) in shortcuts.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", sep_style));
        }
        spans.push(Span::styled(key, key_style));
        spans.push(Span::raw(format!(": {action}")));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportBuilder, ReportId, Tag, TagId, TagTree};
    use ratatui::{Terminal, backend::TestBackend};

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn sample_app() -> App {
        let mut app = App::new();
        app.set_tree(TagTree::from_tags([
            Tag::new(TagId::new(1), "finance"),
            Tag::with_parent(TagId::new(2), "revenue", Some(TagId::new(1))),
        ]));
        app.set_reports(
            vec![ReportBuilder::new(ReportId::new(1), "April summary").build()],
            Some((TagId::new(1), "finance".to_string())),
        );
        app
    }

    #[test]
    fn panels_show_tags_reports_and_placeholder_detail() {
        let screen = render(&sample_app());

        assert!(screen.contains("Tags"));
        assert!(screen.contains("finance"));
        assert!(screen.contains("revenue"));
        assert!(screen.contains("Reports: finance (1)"));
        assert!(screen.contains("April summary"));
        assert!(screen.contains("No report selected"));
    }

    #[test]
    fn detail_shows_tag_paths_and_content() {
        let mut app = sample_app();
        app.set_detail(Some(
            ReportBuilder::new(ReportId::new(1), "April summary")
                .content("Revenue grew")
                .source_path(Some("april.txt".to_string()))
                .tags(vec![Tag::with_parent(
                    TagId::new(2),
                    "revenue",
                    Some(TagId::new(1)),
                )])
                .build(),
        ));

        let screen = render(&app);
        assert!(screen.contains("finance/revenue"));
        assert!(screen.contains("Revenue grew"));
        assert!(screen.contains("april.txt"));
    }

    #[test]
    fn status_replaces_shortcuts() {
        let mut app = sample_app();
        assert!(render(&app).contains("Enter: filter by tag"));

        app.set_status("Error: tag 3 not found");
        let screen = render(&app);
        assert!(screen.contains("Error: tag 3 not found"));
        assert!(!screen.contains("filter by tag"));
    }

    #[test]
    fn pending_delete_shows_question() {
        let mut app = sample_app();
        app.request_delete_tag();

        let screen = render(&app);
        assert!(screen.contains("Delete tag 'finance' and all of its sub-tags? (y/n)"));
        assert!(!screen.contains("filter by tag"));
    }
}
