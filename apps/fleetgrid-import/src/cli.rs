//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Import a group tree from a CSV file and reconcile it with the
/// fleetgrid platform.
///
/// Input lines have the form
/// `ParentName,ParentReference,ChildName,ChildReference,Color,Description`;
/// lines starting with `#`, `'`, `;`, `//` or `--` are comments.
#[derive(Parser, Debug)]
#[command(name = "fleetgrid-import", version, about, verbatim_doc_comment)]
pub struct Cli {
    /// Server name or address (example: my.fleetgrid.example)
    pub server: String,

    /// Database (account) name
    pub database: String,

    /// Path to the CSV file to import
    pub input_file: PathBuf,

    /// User name
    pub username: String,

    /// Password
    pub password: String,

    /// Verbose output (also log unchanged groups and successful rows)
    #[arg(long = "v")]
    pub verbose: bool,

    /// Redirect log output to a file
    #[arg(long = "f", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Root group reference the input file is rooted under
    /// (defaults to the first line's parent reference)
    #[arg(long = "r", value_name = "REFERENCE")]
    pub root_reference: Option<String>,

    /// Delete groups that are absent from the input file, once empty
    #[arg(long = "d")]
    pub delete_empty_groups: bool,

    /// Move associated assets up to the parent before deleting a group
    #[arg(long = "m")]
    pub move_assets_up: bool,

    /// Classify every group but issue no remote changes
    #[arg(long)]
    pub dry_run: bool,
}
