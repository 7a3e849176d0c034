//! Command-line interface: argument definitions and command execution.
//!
//! `execute` writes to any `Write` and reads piped content from any `Read`,
//! so commands can be driven against an in-memory database in tests.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::{
    ListReportsOptions, Report, ReportChanges, ReportDbError, ReportId, ReportService, SortOrder,
    TagId, TagNode, TagTree, utils,
};

/// reportdb - file reports under a hierarchical tag tree
#[derive(Parser, Debug)]
#[command(name = "reportdb")]
#[command(about = "Store reports and find them through a hierarchical tag tree")]
#[command(version)]
pub struct Cli {
    /// SQLite database file [default: reportdb.sqlite3]
    #[arg(long, global = true, env = "REPORTDB_DATABASE", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a report
    AddReport(AddReportCommand),
    /// Change the title, content or tags of a report
    EditReport(EditReportCommand),
    /// Delete a report
    DeleteReport(DeleteReportCommand),
    /// Attach tags to an existing report
    AssignTag(AssignTagCommand),
    /// Create a tag; `a/b` creates `b` under the existing tag `a`
    AddTag(AddTagCommand),
    /// Move a tag under another tag or back to the top level
    SetParent(SetParentCommand),
    /// Delete a tag
    DeleteTag(DeleteTagCommand),
    /// List reports, newest first
    ListReports(ListReportsCommand),
    /// Show the tag tree
    ListTags(ListTagsCommand),
    /// Find reports filed under any of the given tags or their sub-tags
    Search(SearchCommand),
    /// Write the content of a report to a file
    Export(ExportCommand),
    /// Browse the tag tree and reports interactively
    Browse,
}

/// Where the report text comes from. At most one source may be given.
#[derive(Args, Debug, Default, Clone)]
#[group(multiple = false)]
pub struct ContentArgs {
    /// Report text given inline
    #[arg(short, long, value_name = "TEXT")]
    pub content: Option<String>,

    /// Read the report text from a file
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Read the report text from standard input
    #[arg(long)]
    pub stdin: bool,
}

#[derive(Args, Debug)]
pub struct AddReportCommand {
    /// Report title
    #[arg(value_name = "TITLE")]
    pub title: String,

    // Falls back to stdin when no source is given.
    #[command(flatten)]
    pub content: ContentArgs,

    /// Tag name or path; repeat the flag or separate with commas.
    /// `/name` picks a top-level tag whose name is also used deeper down
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct EditReportCommand {
    /// Report id
    pub id: i64,

    /// New title
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    #[command(flatten)]
    pub content: ContentArgs,

    /// Replace the tag set; repeat the flag or separate with commas.
    /// `/name` picks a top-level tag whose name is also used deeper down
    #[arg(short, long = "tag", value_name = "TAG", conflicts_with = "clear_tags")]
    pub tags: Vec<String>,

    /// Remove every tag from the report
    #[arg(long)]
    pub clear_tags: bool,
}

#[derive(Args, Debug)]
pub struct DeleteReportCommand {
    /// Report id
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct AssignTagCommand {
    /// Report id
    pub id: i64,

    /// Tags to attach, as names or paths (`/name` for a top-level tag)
    #[arg(required = true, value_name = "TAG")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AddTagCommand {
    /// Tag name, or a path whose leading segments already exist
    #[arg(value_name = "NAME")]
    pub name: String,

    /// Create the tag under this tag instead of at the top level
    #[arg(short, long, value_name = "TAG")]
    pub parent: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetParentCommand {
    /// Tag to move
    #[arg(value_name = "TAG")]
    pub tag: String,

    /// New parent tag
    #[arg(
        short,
        long,
        value_name = "TAG",
        conflicts_with = "root",
        required_unless_present = "root"
    )]
    pub parent: Option<String>,

    /// Make the tag a top-level tag
    #[arg(long)]
    pub root: bool,
}

#[derive(Args, Debug)]
pub struct DeleteTagCommand {
    /// Tag to delete
    #[arg(value_name = "TAG")]
    pub tag: String,

    /// Also delete every descendant tag
    #[arg(long)]
    pub cascade: bool,
}

#[derive(Args, Debug)]
pub struct ListReportsCommand {
    /// Show at most this many reports
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// List the oldest reports first
    #[arg(long)]
    pub oldest_first: bool,

    /// Print the report text as well
    #[arg(long)]
    pub show_content: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListTagsCommand {
    /// Print the tree as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Tags to search for, as names or paths (`/name` for a top-level tag)
    #[arg(required = true, value_name = "TAG")]
    pub tags: Vec<String>,

    /// Print the report text as well
    #[arg(long)]
    pub show_content: bool,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExportCommand {
    /// Report id
    pub id: i64,

    /// Destination file
    #[arg(value_name = "PATH")]
    pub output: PathBuf,
}

/// Runs one command against `service`.
///
/// # Errors
///
/// Service errors are passed through unchanged so callers can tell user
/// mistakes from internal failures with `downcast_ref::<ReportDbError>()`.
pub fn execute(
    command: &Commands,
    service: &ReportService,
    out: &mut dyn Write,
    input: &mut dyn Read,
) -> Result<()> {
    match command {
        Commands::AddReport(cmd) => add_report(cmd, service, out, input),
        Commands::EditReport(cmd) => edit_report(cmd, service, out, input),
        Commands::DeleteReport(cmd) => {
            service.delete_report(ReportId::new(cmd.id))?;
            writeln!(out, "Report {} deleted", cmd.id)?;
            Ok(())
        }
        Commands::AssignTag(cmd) => assign_tag(cmd, service, out),
        Commands::AddTag(cmd) => add_tag(cmd, service, out),
        Commands::SetParent(cmd) => set_parent(cmd, service, out),
        Commands::DeleteTag(cmd) => delete_tag(cmd, service, out),
        Commands::ListReports(cmd) => list_reports(cmd, service, out),
        Commands::ListTags(cmd) => list_tags(cmd, service, out),
        Commands::Search(cmd) => search(cmd, service, out),
        Commands::Export(cmd) => {
            let path = service.export_report(ReportId::new(cmd.id), &cmd.output)?;
            writeln!(out, "Exported report {} to {}", cmd.id, path.display())?;
            Ok(())
        }
        Commands::Browse => crate::tui::run(service),
    }
}

/// Expands repeated and comma-separated tag flags into one list.
fn expand_tags(values: &[String]) -> Vec<String> {
    values.iter().flat_map(|v| utils::parse_tags(v)).collect()
}

fn as_refs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn read_content(args: &ContentArgs, input: &mut dyn Read) -> Result<Option<String>> {
    if let Some(text) = &args.content {
        return Ok(Some(text.clone()));
    }
    if let Some(path) = &args.file {
        return Ok(Some(utils::read_text_lossy(path)?));
    }
    if args.stdin {
        return read_stdin(input).map(Some);
    }
    Ok(None)
}

fn read_stdin(input: &mut dyn Read) -> Result<String> {
    let mut buffer = String::new();
    input
        .read_to_string(&mut buffer)
        .context("Failed to read report text from stdin")?;
    Ok(buffer)
}

fn add_report(
    cmd: &AddReportCommand,
    service: &ReportService,
    out: &mut dyn Write,
    input: &mut dyn Read,
) -> Result<()> {
    let tags = expand_tags(&cmd.tags);
    let tag_refs = as_refs(&tags);

    let id = if let Some(path) = &cmd.content.file {
        service.import_report(&cmd.title, path, &tag_refs)?
    } else {
        let content = match read_content(&cmd.content, input)? {
            Some(content) => content,
            None => read_stdin(input)?,
        };
        service.add_report(&cmd.title, &content, &tag_refs)?
    };

    write!(out, "Report created (id: {id})")?;
    if !tags.is_empty() {
        write!(out, " with tags: {}", tags.join(", "))?;
    }
    writeln!(out)?;
    Ok(())
}

fn edit_report(
    cmd: &EditReportCommand,
    service: &ReportService,
    out: &mut dyn Write,
    input: &mut dyn Read,
) -> Result<()> {
    let tags = if cmd.clear_tags {
        Some(Vec::new())
    } else if cmd.tags.is_empty() {
        None
    } else {
        Some(expand_tags(&cmd.tags))
    };
    let content = read_content(&cmd.content, input)?;
    // New text replaces the recorded origin: the file it came from, or none.
    let source_path = content.as_ref().map(|_| {
        cmd.content
            .file
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
    });
    let changes = ReportChanges {
        title: cmd.title.clone(),
        content,
        source_path,
        tags,
    };

    let unchanged = changes.is_empty();
    service.edit_report(ReportId::new(cmd.id), changes)?;

    if unchanged {
        writeln!(out, "Report {} unchanged", cmd.id)?;
    } else {
        writeln!(out, "Report {} updated", cmd.id)?;
    }
    Ok(())
}

fn assign_tag(cmd: &AssignTagCommand, service: &ReportService, out: &mut dyn Write) -> Result<()> {
    let tags = expand_tags(&cmd.tags);
    service.assign_tags(ReportId::new(cmd.id), &as_refs(&tags))?;
    writeln!(out, "Tagged report {} with: {}", cmd.id, tags.join(", "))?;
    Ok(())
}

fn add_tag(cmd: &AddTagCommand, service: &ReportService, out: &mut dyn Write) -> Result<()> {
    let mut parent = cmd
        .parent
        .as_deref()
        .map(|reference| service.resolve_tag(reference))
        .transpose()?;

    let segments = utils::tag_path_segments(&cmd.name);
    let Some((leaf, scopes)) = segments.split_last() else {
        return Err(ReportDbError::InvalidTagName {
            name: cmd.name.clone(),
            reason: "name cannot be empty",
        }
        .into());
    };

    // Leading segments name existing tags below `parent` (or the roots).
    if !scopes.is_empty() {
        let tree = service.tag_tree()?;
        for segment in scopes {
            parent = Some(
                tree.child_named(parent, segment)
                    .ok_or_else(|| missing_tag(&tree, parent, segment))?,
            );
        }
    }

    let id = service.create_tag(leaf, parent)?;
    writeln!(out, "Tag created (id: {id}): {}", service.tag_path(id)?)?;
    Ok(())
}

fn missing_tag(tree: &TagTree, parent: Option<TagId>, segment: &str) -> ReportDbError {
    let name = match parent.and_then(|p| tree.path_of(p)) {
        Some(path) => format!("{path}{}{segment}", crate::PATH_SEPARATOR),
        None => segment.to_string(),
    };
    ReportDbError::UnknownTag { name }
}

fn set_parent(cmd: &SetParentCommand, service: &ReportService, out: &mut dyn Write) -> Result<()> {
    let tag = service.resolve_tag(&cmd.tag)?;
    let parent = if cmd.root {
        None
    } else {
        cmd.parent
            .as_deref()
            .map(|reference| service.resolve_tag(reference))
            .transpose()?
    };

    service.set_parent(tag, parent)?;
    writeln!(out, "Tag {tag} is now {}", service.tag_path(tag)?)?;
    Ok(())
}

fn delete_tag(cmd: &DeleteTagCommand, service: &ReportService, out: &mut dyn Write) -> Result<()> {
    let tag = service.resolve_tag(&cmd.tag)?;
    let path = service.tag_path(tag)?;
    let removed = service.delete_tag(tag, cmd.cascade)?;

    write!(out, "Deleted tag {path}")?;
    if removed.len() > 1 {
        write!(out, " and {} descendant tag(s)", removed.len() - 1)?;
    }
    writeln!(out)?;
    Ok(())
}

fn list_reports(
    cmd: &ListReportsCommand,
    service: &ReportService,
    out: &mut dyn Write,
) -> Result<()> {
    let options = ListReportsOptions {
        include_content: cmd.show_content,
        limit: cmd.limit,
        order: if cmd.oldest_first {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        },
    };
    let reports = service.list_reports(options)?;

    if cmd.json {
        return write_json(out, &reports);
    }
    if reports.is_empty() {
        writeln!(out, "No reports yet")?;
        return Ok(());
    }
    write_reports(out, &reports, &service.tag_tree()?, cmd.show_content)
}

fn list_tags(cmd: &ListTagsCommand, service: &ReportService, out: &mut dyn Write) -> Result<()> {
    let forest = service.list_tree()?;
    if cmd.json {
        return write_json(out, &forest);
    }
    write_tag_tree(out, &forest)
}

fn search(cmd: &SearchCommand, service: &ReportService, out: &mut dyn Write) -> Result<()> {
    let tags = expand_tags(&cmd.tags);
    let reports = service.search(&as_refs(&tags))?;

    if cmd.json {
        return write_json(out, &reports);
    }
    if reports.is_empty() {
        writeln!(out, "No reports found")?;
        return Ok(());
    }
    write_reports(out, &reports, &service.tag_tree()?, cmd.show_content)
}

fn write_json<T: serde::Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("Failed to write JSON output")?;
    writeln!(out)?;
    Ok(())
}

/// Tag paths of a report, in the order the report lists its tags.
fn tag_paths(report: &Report, tree: &TagTree) -> Vec<String> {
    report
        .tags()
        .iter()
        .map(|tag| {
            tree.path_of(tag.id())
                .unwrap_or_else(|| tag.name().to_string())
        })
        .collect()
}

fn write_reports(
    out: &mut dyn Write,
    reports: &[Report],
    tree: &TagTree,
    show_content: bool,
) -> Result<()> {
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_report(out, report, tree, show_content)?;
    }
    Ok(())
}

fn write_report(
    out: &mut dyn Write,
    report: &Report,
    tree: &TagTree,
    show_content: bool,
) -> Result<()> {
    writeln!(
        out,
        "[{}] {} ({} UTC)",
        report.id(),
        report.title(),
        utils::format_timestamp(report.created_at())
    )?;
    if let Some(source) = report.source_path() {
        writeln!(out, "    source: {source}")?;
    }

    let paths = tag_paths(report, tree);
    if paths.is_empty() {
        writeln!(out, "    tags: (none)")?;
    } else {
        writeln!(out, "    tags: {}", paths.join(", "))?;
    }

    if show_content && report.has_content() {
        for line in report.content().lines() {
            writeln!(out, "    | {line}")?;
        }
    }
    Ok(())
}

/// Draws the forest with box-drawing connectors, one tag per line.
fn write_tag_tree(out: &mut dyn Write, forest: &[TagNode]) -> Result<()> {
    if forest.is_empty() {
        writeln!(out, "No tags yet")?;
        return Ok(());
    }

    // (node, prefix inherited from its ancestors, is last sibling)
    let mut pending: Vec<(&TagNode, String, bool)> = Vec::new();
    push_siblings(&mut pending, forest, "");

    while let Some((node, prefix, last)) = pending.pop() {
        let connector = if last { "└── " } else { "├── " };
        writeln!(
            out,
            "{prefix}{connector}{} [{}]",
            node.tag.name(),
            node.tag.id()
        )?;

        let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
        push_siblings(&mut pending, &node.children, &child_prefix);
    }
    Ok(())
}

/// Pushes siblings in reverse so they pop in display order.
fn push_siblings<'a>(
    pending: &mut Vec<(&'a TagNode, String, bool)>,
    nodes: &'a [TagNode],
    prefix: &str,
) {
    for (i, node) in nodes.iter().enumerate().rev() {
        pending.push((node, prefix.to_string(), i + 1 == nodes.len()));
    }
}
