//! The import run: parse, fetch, reconcile, report.

use std::fs::File;
use std::io::BufReader;

use fleetgrid_api::ApiClient;
use fleetgrid_sync::{
    fetch_existing_tree, parse_rows, ReconcileOptions, Reconciler, TreeBuilder,
};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};
use crate::logging::Logger;
use crate::output::{describe_outcome, describe_row, summary_line};

/// Run one import end to end.
///
/// A failure to read the input file or to authenticate aborts before any
/// remote mutation; per-row and per-node errors are logged and the run
/// continues.
pub async fn execute(args: Cli, logger: &Logger) -> CliResult<()> {
    tracing::info!(file = %args.input_file.display(), "starting group import");
    let file = File::open(&args.input_file).map_err(|e| CliError::InputFile {
        path: args.input_file.display().to_string(),
        message: e.to_string(),
    })?;

    let client = ApiClient::new(&args.server, &args.database, &args.username, &args.password)?;
    client.authenticate().await?;
    logger.verbose_line(&format!(
        "authenticated against {} as {}",
        args.server, args.username
    ));

    let mut builder = TreeBuilder::new(args.root_reference.clone());
    let outcomes = parse_rows(BufReader::new(file), &mut builder)?;
    for outcome in &outcomes {
        if let Some(line) = describe_row(outcome, logger.is_verbose()) {
            logger.line(&line);
        }
    }

    let parsed_count = outcomes.iter().filter(|o| o.is_ok()).count();
    if parsed_count == 0 {
        return Err(CliError::Validation(
            "parsed 0 groups; nothing to import".to_string(),
        ));
    }

    let root_reference = builder
        .root_reference()
        .map(str::to_string)
        .ok_or_else(|| CliError::Validation("no root group reference".to_string()))?;
    let parsed = builder.into_tree();
    logger.verbose_line(&format!(
        "parsed {} groups under root '{}'",
        parsed.len(),
        root_reference
    ));

    let existing = fetch_existing_tree(&client, &root_reference).await?;

    let options = ReconcileOptions {
        delete_empty_groups: args.delete_empty_groups,
        move_assets_up: args.move_assets_up,
        dry_run: args.dry_run,
    };
    let report = Reconciler::new(&client, options)
        .run(&parsed, &existing, |outcome| {
            if let Some(line) = describe_outcome(outcome, logger.is_verbose()) {
                logger.line(&line);
            }
        })
        .await;

    logger.line(&summary_line(&report.summary, args.dry_run));
    Ok(())
}
