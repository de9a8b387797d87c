//! fleetgrid group import reconciliation
//!
//! Parses a CSV describing a hierarchical group tree, diffs it against
//! the tree stored on the platform, and computes the minimal set of
//! add/set/remove calls to reconcile the stored state with the file.
//!
//! # Modules
//!
//! - [`row`] - Line-oriented CSV parsing with per-row outcomes
//! - [`tree`] - Arena-backed group tree with reference lookup
//! - [`builder`] - Parsed-tree and existing-tree construction
//! - [`reconcile`] - The diff-and-apply engine
//!
//! The remote store is consumed through
//! [`ApiSession`](fleetgrid_api::ApiSession); nothing here opens
//! connections of its own, which keeps the engine testable against an
//! in-memory session.

pub mod builder;
pub mod reconcile;
pub mod row;
pub mod tree;

pub use builder::{
    existing_tree_from_groups, fetch_existing_tree, GroupRow, ReparentPolicy, TreeBuilder,
};
pub use reconcile::{
    Disposition, ImportOutcome, ImportReport, ImportSummary, ReconcileOptions, Reconciler,
    SkipReason,
};
pub use row::{create_dictionary, parse_rows, RowError, RowHandler, RowOutcome};
pub use tree::{GroupNode, GroupTree, NodeId};
