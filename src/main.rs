use std::io;

use anyhow::Result;
use clap::Parser;
use reportdb::{ReportDbError, ReportService, cli::Cli, config::Config};

fn main() {
    // A .env file may set REPORTDB_DATABASE; it must load before clap reads env.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Sends log output to stderr. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::resolve(cli.database.clone());
    log::debug!("using database {}", config.database.display());

    let service = ReportService::new(config.open_database()?);
    reportdb::cli::execute(&cli.command, &service, &mut io::stdout(), &mut io::stdin())
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad references, missing records, rule violations and
/// unreadable input files. Database and other internal failures are not.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<ReportDbError>()
            .is_some_and(ReportDbError::is_user_error)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use reportdb::{ReportId, TagId};

    #[test]
    fn service_errors_are_user_errors() {
        let err = anyhow::Error::from(ReportDbError::UnknownTag {
            name: "nope".to_string(),
        });
        assert!(is_user_error(&err));

        let err = anyhow::Error::from(ReportDbError::CycleDetected {
            tag: TagId::new(1),
            parent: TagId::new(2),
        });
        assert!(is_user_error(&err));
    }

    #[test]
    fn wrapped_service_errors_keep_their_kind() {
        let result: std::result::Result<(), ReportDbError> = Err(ReportDbError::NotFound {
            entity: reportdb::Entity::Report,
            id: ReportId::new(9).get(),
        });
        let err = result.context("while editing").unwrap_err();
        assert!(is_user_error(&err));
    }

    #[test]
    fn database_failures_are_internal() {
        let err = anyhow::Error::from(ReportDbError::Database(
            rusqlite::Error::InvalidQuery,
        ));
        assert!(!is_user_error(&err));
    }

    #[test]
    fn plain_errors_are_internal() {
        let err = anyhow::anyhow!("something broke");
        assert!(!is_user_error(&err));
    }
}
