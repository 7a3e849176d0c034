//! End-to-end tests for the command surface against an on-disk database.
//!
//! Each command opens the database afresh, the way separate invocations of
//! the binary would.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use reportdb::{ReportDbError, ReportId, ReportService, cli::Cli, config::Config};

/// Runs one command line against the database at `db` and returns stdout.
fn run(db: &Path, args: &[&str]) -> Result<String> {
    run_with_stdin(db, args, "")
}

fn run_with_stdin(db: &Path, args: &[&str], stdin: &str) -> Result<String> {
    let db_arg = db.to_string_lossy().to_string();
    let mut argv = vec!["reportdb", "--database", db_arg.as_str()];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;

    let service = ReportService::new(Config::resolve(cli.database.clone()).open_database()?);
    let mut out = Vec::new();
    reportdb::cli::execute(&cli.command, &service, &mut out, &mut stdin.as_bytes())?;
    Ok(String::from_utf8(out)?)
}

fn service_error(err: &anyhow::Error) -> &ReportDbError {
    err.downcast_ref::<ReportDbError>()
        .expect("error should come from the service")
}

#[test]
fn test_walkthrough_persists_across_invocations() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");

    assert_eq!(run(&db, &["add-tag", "財報"])?, "Tag created (id: 1): 財報\n");
    assert_eq!(
        run(&db, &["add-tag", "財報/收入"])?,
        "Tag created (id: 2): 財報/收入\n"
    );
    assert_eq!(
        run(&db, &["add-report", "四月月報", "--content", "營收成長", "--tag", "財報/收入"])?,
        "Report created (id: 1) with tags: 財報/收入\n"
    );

    let found = run(&db, &["search", "財報"])?;
    assert!(found.starts_with("[1] 四月月報"));
    assert!(found.contains("tags: 財報/收入"));

    let err = run(&db, &["delete-tag", "財報"]).unwrap_err();
    assert!(matches!(service_error(&err), ReportDbError::HasChildren { .. }));
    assert!(service_error(&err).is_user_error());

    run(&db, &["delete-tag", "財報", "--cascade"])?;

    let err = run(&db, &["search", "財報"]).unwrap_err();
    assert!(matches!(service_error(&err), ReportDbError::UnknownTag { .. }));

    let listed = run(&db, &["list-reports"])?;
    assert!(listed.contains("[1] 四月月報"));
    assert!(listed.contains("tags: (none)"));
    Ok(())
}

#[test]
fn test_content_from_stdin_flag() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");

    run_with_stdin(&db, &["add-report", "Piped", "--stdin"], "line 1\nline 2\n")?;
    run_with_stdin(&db, &["edit-report", "1", "--stdin"], "replaced\n")?;

    let service = ReportService::new(Config::resolve(Some(db)).open_database()?);
    let report = service.get_report(ReportId::new(1))?;
    assert_eq!(report.content(), "replaced\n");
    assert_eq!(report.title(), "Piped");
    Ok(())
}

#[test]
fn test_edit_report_from_file_and_new_tags() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");
    let body = dir.path().join("body.txt");
    std::fs::write(&body, "from file")?;
    let body_arg = body.to_string_lossy().to_string();

    run(&db, &["add-tag", "a"])?;
    run(&db, &["add-tag", "b"])?;
    run(&db, &["add-report", "R", "-c", "x", "-t", "a"])?;
    let output = run(
        &db,
        &["edit-report", "1", "--title", "R2", "--file", &body_arg, "--tag", "b"],
    )?;
    assert_eq!(output, "Report 1 updated\n");

    let shown = run(&db, &["list-reports", "--show-content"])?;
    assert!(shown.contains("[1] R2"));
    assert!(shown.contains("tags: b\n"));
    assert!(shown.contains("    | from file"));
    Ok(())
}

#[test]
fn test_assign_tag_and_json_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");

    run(&db, &["add-tag", "finance"])?;
    run(&db, &["add-tag", "ops"])?;
    run(&db, &["add-report", "R", "-c", "body"])?;
    assert_eq!(
        run(&db, &["assign-tag", "1", "finance", "ops"])?,
        "Tagged report 1 with: finance, ops\n"
    );

    let json: serde_json::Value =
        serde_json::from_str(&run(&db, &["search", "finance", "--json"])?)?;
    assert_eq!(json[0]["id"], 1);
    assert_eq!(json[0]["title"], "R");
    assert_eq!(json[0]["content"], "body");
    assert_eq!(json[0]["tags"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn test_set_parent_cycle_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");

    run(&db, &["add-tag", "a"])?;
    run(&db, &["add-tag", "a/b"])?;
    run(&db, &["add-tag", "a/b/c"])?;

    let err = run(&db, &["set-parent", "a", "--parent", "a/b/c"]).unwrap_err();
    assert!(matches!(service_error(&err), ReportDbError::CycleDetected { .. }));

    assert_eq!(
        run(&db, &["list-tags"])?,
        "└── a [1]\n    └── b [2]\n        └── c [3]\n"
    );
    Ok(())
}

#[test]
fn test_ambiguous_name_needs_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");

    run(&db, &["add-tag", "2025"])?;
    run(&db, &["add-tag", "2026"])?;
    run(&db, &["add-tag", "q1", "--parent", "2025"])?;
    run(&db, &["add-tag", "q1", "--parent", "2026"])?;

    let err = run(&db, &["add-report", "R", "-c", "x", "-t", "q1"]).unwrap_err();
    let message = err.to_string();
    assert!(matches!(service_error(&err), ReportDbError::AmbiguousTag { .. }));
    assert!(message.contains("2025/q1"));
    assert!(message.contains("2026/q1"));

    run(&db, &["add-report", "R", "-c", "x", "-t", "2026/q1"])?;
    assert!(run(&db, &["search", "2025"])?.contains("No reports found"));
    assert!(run(&db, &["search", "2026"])?.contains("[1] R"));
    Ok(())
}

#[test]
fn test_delete_report_then_not_found() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");

    run(&db, &["add-report", "R", "-c", "x"])?;
    assert_eq!(run(&db, &["delete-report", "1"])?, "Report 1 deleted\n");

    let err = run(&db, &["delete-report", "1"]).unwrap_err();
    assert!(matches!(service_error(&err), ReportDbError::NotFound { id: 1, .. }));
    assert_eq!(run(&db, &["list-reports"])?, "No reports yet\n");
    Ok(())
}

#[test]
fn test_export_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");
    let dest = dir.path().join("export.txt");
    let dest_arg = dest.to_string_lossy().to_string();
    let content = "first line\n\n  second line with 中文\n";

    run(&db, &["add-report", "R", "--content", content])?;
    let output = run(&db, &["export", "1", &dest_arg])?;

    assert!(output.starts_with("Exported report 1 to "));
    assert_eq!(std::fs::read_to_string(&dest)?, content);
    Ok(())
}

#[test]
fn test_missing_input_file_is_user_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("reports.sqlite3");
    let missing = dir.path().join("missing.txt");
    let missing_arg = missing.to_string_lossy().to_string();

    let err = run(&db, &["add-report", "R", "--file", &missing_arg]).unwrap_err();
    assert!(matches!(service_error(&err), ReportDbError::Io { .. }));
    assert!(service_error(&err).is_user_error());
    Ok(())
}
