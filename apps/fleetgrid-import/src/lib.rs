//! fleetgrid-import - group import reconciliation tool
//!
//! Command-line shell around [`fleetgrid_sync`]: parses the import file,
//! fetches the stored tree, runs the reconciler, and prints one line per
//! row outcome and per node disposition plus a final summary.

pub mod cli;
pub mod error;
pub mod import;
pub mod logging;
pub mod output;
