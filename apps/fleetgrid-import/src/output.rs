//! Human-readable lines for row outcomes and node dispositions.

use fleetgrid_sync::{Disposition, ImportOutcome, ImportSummary, RowOutcome};

/// Describe a row outcome, or `None` when the line should be suppressed.
///
/// Rejected rows are always reported; successful rows only in verbose
/// mode.
pub fn describe_row<T>(outcome: &RowOutcome<T>, verbose: bool) -> Option<String> {
    match &outcome.result {
        Ok(_) if verbose => Some(format!("row {}: parsed \"{}\"", outcome.row, outcome.line)),
        Ok(_) => None,
        Err(e) => Some(format!(
            "row {} rejected: {} (\"{}\")",
            outcome.row, e, outcome.line
        )),
    }
}

/// Describe a node disposition, or `None` when the line should be
/// suppressed.
///
/// Unchanged groups are only reported in verbose mode; everything else
/// always gets a line.
pub fn describe_outcome(outcome: &ImportOutcome, verbose: bool) -> Option<String> {
    if outcome.disposition == Disposition::Unchanged && outcome.error.is_none() && !verbose {
        return None;
    }

    let subject = format!("\"{}\" ({})", outcome.name, outcome.reference);

    let line = match (&outcome.disposition, &outcome.error) {
        (Disposition::Skipped(reason), Some(error)) => {
            format!("skipped {subject}: {reason} ({error})")
        }
        (Disposition::Skipped(reason), None) => format!("skipped {subject}: {reason}"),
        (d, Some(error)) => format!("failed to {} {subject}: {error}", action_verb(d)),
        (d, None) => match &outcome.remote_id {
            Some(id) if *d != Disposition::Unchanged => format!("{d} {subject} [{id}]"),
            _ => format!("{d} {subject}"),
        },
    };
    Some(line)
}

/// The final summary line.
pub fn summary_line(summary: &ImportSummary, dry_run: bool) -> String {
    if dry_run {
        format!("dry run complete: {summary}")
    } else {
        format!("import complete: {summary}")
    }
}

fn action_verb(disposition: &Disposition) -> &'static str {
    match disposition {
        Disposition::Added => "add",
        Disposition::Updated => "update",
        Disposition::Moved => "move",
        Disposition::Deleted => "delete",
        _ => "process",
    }
}
