//! Terminal browser for the tag tree and reports.
//!
//! Uses ratatui for rendering and crossterm for terminal management. Key
//! handling only touches [`App`] state; anything that needs the database is
//! returned as an [`Action`] and carried out by [`apply_action`].

use std::io;
use std::panic;

use anyhow::{Context, Result};
use crossterm::{
    event::{self as crossterm_event, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::{ListReportsOptions, ReportId, ReportService, TagId};

mod app;
pub mod event;
mod ui;

pub use app::{Action, App, Confirm, Focus, TagRow, flatten_tree};

/// Most recent reports shown when no tag filter is active.
const UNFILTERED_LIMIT: usize = 200;

/// Initializes the terminal for TUI rendering.
///
/// Enables raw mode and enters the alternate screen.
fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
///
/// This should always be called before exiting the TUI, even in error
/// cases, to prevent terminal corruption.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

/// Minimal terminal restoration for the panic hook. Errors are ignored
/// since we're likely already in a bad state.
fn restore_terminal_panic() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

/// Installs a panic hook that restores the terminal before the original
/// hook prints the panic.
fn init_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal_panic();
        original_hook(panic_info);
    }));
}

/// Runs the event loop until the user quits.
///
/// Terminal state is always restored, even on error.
pub fn run_event_loop(app: &mut App, service: &ReportService) -> Result<()> {
    let mut terminal = init_terminal()?;

    let result = run_event_loop_internal(app, service, &mut terminal);

    if let Err(e) = restore_terminal(&mut terminal) {
        eprintln!("Error restoring terminal: {e}");
    }

    result
}

fn run_event_loop_internal(
    app: &mut App,
    service: &ReportService,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            ui::draw(frame, app);
        })?;

        if crossterm_event::poll(std::time::Duration::from_millis(100))?
            && let Event::Key(key) = crossterm_event::read()?
        {
            let action = event::handle_key_event(app, key);
            if apply_action(app, service, action) {
                break;
            }
        }
    }

    Ok(())
}

/// Carries out an action against the database.
///
/// Returns `true` when the browser should quit. Failures are shown in the
/// status bar rather than ending the session.
pub fn apply_action(app: &mut App, service: &ReportService, action: Action) -> bool {
    let result = match action {
        Action::None => Ok(()),
        Action::Quit => return true,
        Action::FilterByTag(tag) => filter_by_tag(app, service, tag),
        Action::ShowAll => show_all(app, service),
        Action::OpenReport(id) => open_report(app, service, id),
        Action::DeleteTag { tag, cascade } => delete_tag(app, service, tag, cascade),
        Action::DeleteReport(id) => delete_report(app, service, id),
        Action::Export(id) => export_report(app, service, id),
    };

    if let Err(e) = result {
        app.set_status(format!("Error: {e:#}"));
    }
    false
}

fn filter_by_tag(app: &mut App, service: &ReportService, tag: TagId) -> Result<()> {
    let reports = service.reports_under(tag)?;
    let path = service.tag_path(tag)?;
    app.set_reports(reports, Some((tag, path)));
    open_selected(app, service)
}

/// Reloads the tag tree and lists the most recent reports.
fn show_all(app: &mut App, service: &ReportService) -> Result<()> {
    app.set_tree(service.tag_tree().context("Failed to load tags")?);

    let options = ListReportsOptions {
        limit: Some(UNFILTERED_LIMIT),
        ..Default::default()
    };
    let reports = service
        .list_reports(options)
        .context("Failed to load reports")?;
    app.set_reports(reports, None);
    open_selected(app, service)
}

/// Reloads after a change, keeping the tag filter while its tag exists.
fn refresh(app: &mut App, service: &ReportService) -> Result<()> {
    let filter = app.filter_tag();
    show_all(app, service)?;
    match filter {
        Some(tag) if app.has_tag(tag) => filter_by_tag(app, service, tag),
        _ => Ok(()),
    }
}

fn delete_tag(app: &mut App, service: &ReportService, tag: TagId, cascade: bool) -> Result<()> {
    let path = service.tag_path(tag)?;
    let removed = service.delete_tag(tag, cascade)?;
    refresh(app, service)?;

    let mut message = format!("Deleted tag {path}");
    if removed.len() > 1 {
        message.push_str(&format!(" and {} descendant tag(s)", removed.len() - 1));
    }
    app.set_status(message);
    Ok(())
}

fn delete_report(app: &mut App, service: &ReportService, id: ReportId) -> Result<()> {
    service.delete_report(id)?;
    refresh(app, service)?;
    app.set_status(format!("Report {id} deleted"));
    Ok(())
}

fn export_report(app: &mut App, service: &ReportService, id: ReportId) -> Result<()> {
    let path = service.export_report(id, app.export_path(id))?;
    app.set_status(format!("Exported report {id} to {}", path.display()));
    Ok(())
}

fn open_selected(app: &mut App, service: &ReportService) -> Result<()> {
    match app.selected_report().map(|r| r.id()) {
        Some(id) => open_report(app, service, id),
        None => {
            app.set_detail(None);
            Ok(())
        }
    }
}

fn open_report(app: &mut App, service: &ReportService, id: ReportId) -> Result<()> {
    let report = service.get_report(id)?;
    app.set_detail(Some(report));
    Ok(())
}

/// Entry point for the browser.
///
/// Loads the tag tree and recent reports, then runs the event loop.
pub fn run(service: &ReportService) -> Result<()> {
    init_panic_hook();

    let mut app = App::new();
    show_all(&mut app, service).context("Failed to load the browser")?;

    run_event_loop(&mut app, service).context("TUI event loop failed")?;

    Ok(())
}
