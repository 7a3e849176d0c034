//! Keyboard event handling for the browser.
//!
//! Maps crossterm key events to state changes and to [`Action`]s that the
//! event loop carries out against the database. Key behavior depends on
//! which panel has focus.

use crossterm::event::{KeyCode, KeyEvent};

use super::app::{Action, App, Focus};

/// Handles a keyboard event and returns the follow-up action.
///
/// # Event Handling
///
/// - `q`: quit (from any panel)
/// - `Tab` / `Shift+Tab`: cycle focus between panels
/// - `Esc`: return focus to the tag tree
/// - `a`: drop the tag filter and list every report
/// - Tag tree: `j`/`k` move, `Enter` filters reports by the selected tag,
///   `d` deletes the tag (and its sub-tags)
/// - Report list: `j`/`k` move and open the selected report, `d` deletes
///   it, `e` exports it
/// - Detail: `j`/`k` scroll, `e` exports the shown report
///
/// Deletes wait for confirmation: `y` goes ahead, any other key cancels.
///
/// # Examples
///
/// ```
/// use reportdb::tui::{Action, App, event::handle_key_event};
/// use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
///
/// let mut app = App::new();
/// let key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
/// assert_eq!(handle_key_event(&mut app, key), Action::Quit);
/// ```
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Action {
    // Any key dismisses the previous status message
    app.clear_status();

    if let Some(confirm) = app.take_confirm() {
        return match key.code {
            KeyCode::Char('y' | 'Y') => confirm.action(),
            _ => {
                app.set_status("Cancelled");
                Action::None
            }
        };
    }

    if !key.modifiers.is_empty() && key.code != KeyCode::BackTab {
        return Action::None;
    }

    match key.code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('a') => return Action::ShowAll,
        KeyCode::Tab => {
            app.next_focus();
            return Action::None;
        }
        KeyCode::BackTab => {
            app.prev_focus();
            return Action::None;
        }
        KeyCode::Esc => {
            app.reset_focus();
            return Action::None;
        }
        _ => {}
    }

    match app.focus() {
        Focus::TagTree => handle_tag_tree(app, key),
        Focus::ReportList => handle_report_list(app, key),
        Focus::Detail => handle_detail(app, key),
    }
}

fn handle_tag_tree(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next_tag();
            Action::None
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous_tag();
            Action::None
        }
        KeyCode::Enter => app
            .selected_tag()
            .map_or(Action::None, |row| Action::FilterByTag(row.id)),
        KeyCode::Char('d') => {
            app.request_delete_tag();
            Action::None
        }
        _ => Action::None,
    }
}

fn handle_report_list(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('d') => {
            app.request_delete_report();
            return Action::None;
        }
        KeyCode::Char('e') => {
            return app
                .selected_report()
                .map_or(Action::None, |r| Action::Export(r.id()));
        }
        _ => {}
    }

    let selected = match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next_report(),
        KeyCode::Char('k') | KeyCode::Up => app.select_previous_report(),
        KeyCode::Enter => {
            let id = app.selected_report().map(|r| r.id());
            if id.is_some() {
                app.next_focus();
            }
            id
        }
        _ => None,
    };
    selected.map_or(Action::None, Action::OpenReport)
}

fn handle_detail(app: &mut App, key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_detail_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_detail_up(1),
        KeyCode::PageDown => app.scroll_detail_down(10),
        KeyCode::PageUp => app.scroll_detail_up(10),
        KeyCode::Char('e') => {
            return app.detail().map_or(Action::None, |r| Action::Export(r.id()));
        }
        _ => {}
    }
    Action::None
}
