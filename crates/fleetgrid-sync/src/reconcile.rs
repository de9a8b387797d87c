//! Diff-and-apply engine.
//!
//! Walks the parsed and existing trees, classifies every node, and issues
//! the remote calls needed to make the stored tree match the file:
//! top-down for additions and updates (a parent's remote id must exist
//! before its children are submitted), bottom-up for deletions (children
//! before parents). One node's remote failure never aborts the run.

use std::collections::{HashMap, HashSet};
use std::fmt;

use fleetgrid_api::{ApiResult, ApiSession, AssetClass, AssetRef, EntityId, Group};
use tracing::{debug, info};

use crate::tree::{GroupNode, GroupTree, NodeId};

/// Terminal classification of a node after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Present in the file, absent from the store; an add was issued.
    Added,
    /// Present in both with differing attributes; a set was issued.
    Updated,
    /// Present in both under a different parent; a set re-parenting the
    /// group (and applying any attribute changes) was issued.
    Moved,
    /// Present in both and identical; no call issued.
    Unchanged,
    /// Absent from the file; a remove was issued.
    Deleted,
    /// No call issued, for the stated reason.
    Skipped(SkipReason),
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Added => write!(f, "added"),
            Disposition::Updated => write!(f, "updated"),
            Disposition::Moved => write!(f, "moved"),
            Disposition::Unchanged => write!(f, "unchanged"),
            Disposition::Deleted => write!(f, "deleted"),
            Disposition::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Why a node was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The node's parent could not be created, so no remote parent id is
    /// available.
    ParentFailed,
    /// Deleting groups absent from the file is disabled.
    DeletionDisabled,
    /// The group still has child groups.
    HasChildren,
    /// The group is referenced by assets and moving them up is disabled
    /// (or moving them up failed).
    HasAssets { count: usize },
    /// Asset associations could not be fetched, so delete-eligibility is
    /// unknown.
    AssetsUnknown,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ParentFailed => write!(f, "parent group could not be created"),
            SkipReason::DeletionDisabled => write!(f, "deletion of absent groups is disabled"),
            SkipReason::HasChildren => write!(f, "has remaining child groups"),
            SkipReason::HasAssets { count } => {
                write!(f, "has {count} associated asset(s)")
            }
            SkipReason::AssetsUnknown => {
                write!(f, "associated assets could not be determined")
            }
        }
    }
}

/// One node's result, raised for every processed node.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub reference: String,
    pub name: String,
    pub disposition: Disposition,
    /// The node's id in the remote store, when known.
    pub remote_id: Option<EntityId>,
    /// Remote-call failure for this node, if any.
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-disposition counts for the final summary.
///
/// An outcome that carried a remote-call error counts only as `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ImportSummary {
    fn record(&mut self, outcome: &ImportOutcome) {
        if outcome.failed() {
            self.failed += 1;
            return;
        }
        match outcome.disposition {
            Disposition::Added => self.added += 1,
            Disposition::Updated => self.updated += 1,
            Disposition::Moved => self.moved += 1,
            Disposition::Unchanged => self.unchanged += 1,
            Disposition::Deleted => self.deleted += 1,
            Disposition::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.added
            + self.updated
            + self.moved
            + self.unchanged
            + self.deleted
            + self.skipped
            + self.failed
    }
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added {}, updated {}, moved {}, unchanged {}, deleted {}, skipped {}, failed {}",
            self.added,
            self.updated,
            self.moved,
            self.unchanged,
            self.deleted,
            self.skipped,
            self.failed
        )
    }
}

/// Every outcome of a run, in emission order, plus the summary.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub outcomes: Vec<ImportOutcome>,
    pub summary: ImportSummary,
}

impl ImportReport {
    fn push(&mut self, outcome: ImportOutcome, observe: &mut impl FnMut(&ImportOutcome)) {
        self.summary.record(&outcome);
        observe(&outcome);
        self.outcomes.push(outcome);
    }
}

/// Behavior switches for a reconciliation run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Delete groups absent from the file once they are empty.
    pub delete_empty_groups: bool,
    /// Re-home a blocking group's asset associations to its parent before
    /// deleting it.
    pub move_assets_up: bool,
    /// Classify every node but issue no remote mutation.
    pub dry_run: bool,
}

/// Remote id resolution for a processed parsed node.
enum Applied {
    Remote(EntityId),
    /// Dry-run add: the node would exist but has no id yet.
    Pending,
}

/// The diff-and-apply engine.
pub struct Reconciler<'a> {
    session: &'a dyn ApiSession,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(session: &'a dyn ApiSession, options: ReconcileOptions) -> Self {
        Self { session, options }
    }

    /// Reconcile the stored tree with the parsed one.
    ///
    /// `observe` is invoked once per node as its outcome is determined;
    /// the same outcomes are returned in the report. Remote failures are
    /// captured per node and never abort the run.
    pub async fn run(
        &self,
        parsed: &GroupTree,
        existing: &GroupTree,
        mut observe: impl FnMut(&ImportOutcome),
    ) -> ImportReport {
        let mut report = ImportReport::default();
        self.upsert_pass(parsed, existing, &mut report, &mut observe)
            .await;
        self.delete_pass(parsed, existing, &mut report, &mut observe)
            .await;
        info!(summary = %report.summary, "reconciliation finished");
        report
    }

    /// Top-down pass: additions, updates and moves, parents before
    /// children.
    async fn upsert_pass(
        &self,
        parsed: &GroupTree,
        existing: &GroupTree,
        report: &mut ImportReport,
        observe: &mut impl FnMut(&ImportOutcome),
    ) {
        let Some(root) = parsed.root() else {
            return;
        };

        let mut applied: HashMap<NodeId, Applied> = HashMap::new();
        let mut failed: HashSet<NodeId> = HashSet::new();

        for id in parsed.breadth_first(root) {
            let node = parsed.node(id);
            let parent = parsed.parent(id);

            if let Some(parent_id) = parent {
                if failed.contains(&parent_id) {
                    failed.insert(id);
                    report.push(
                        outcome(node, Disposition::Skipped(SkipReason::ParentFailed)),
                        observe,
                    );
                    continue;
                }
            }

            let parent_remote = parent.and_then(|p| match applied.get(&p) {
                Some(Applied::Remote(remote)) => Some(remote.clone()),
                _ => None,
            });

            match existing.lookup(&node.reference) {
                None => {
                    self.apply_add(id, node, parent_remote, &mut applied, &mut failed, report, observe)
                        .await;
                }
                Some(existing_id) => {
                    self.apply_upsert(
                        parsed,
                        existing,
                        id,
                        existing_id,
                        parent_remote,
                        &mut applied,
                        &mut failed,
                        report,
                        observe,
                    )
                    .await;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_add(
        &self,
        id: NodeId,
        node: &GroupNode,
        parent_remote: Option<EntityId>,
        applied: &mut HashMap<NodeId, Applied>,
        failed: &mut HashSet<NodeId>,
        report: &mut ImportReport,
        observe: &mut impl FnMut(&ImportOutcome),
    ) {
        debug!(reference = %node.reference, "adding group");
        if self.options.dry_run {
            applied.insert(id, Applied::Pending);
            report.push(outcome(node, Disposition::Added), observe);
            return;
        }

        let entity = group_entity(node, None, parent_remote);
        match self.session.add_group(&entity).await {
            Ok(remote) => {
                applied.insert(id, Applied::Remote(remote.clone()));
                report.push(
                    outcome(node, Disposition::Added).with_remote_id(remote),
                    observe,
                );
            }
            Err(e) => {
                failed.insert(id);
                report.push(
                    outcome(node, Disposition::Added).with_error(e.to_string()),
                    observe,
                );
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_upsert(
        &self,
        parsed: &GroupTree,
        existing: &GroupTree,
        id: NodeId,
        existing_id: NodeId,
        parent_remote: Option<EntityId>,
        applied: &mut HashMap<NodeId, Applied>,
        failed: &mut HashSet<NodeId>,
        report: &mut ImportReport,
        observe: &mut impl FnMut(&ImportOutcome),
    ) {
        let node = parsed.node(id);
        let current = existing.node(existing_id);

        let Some(remote_id) = current.remote_id.clone() else {
            // Malformed snapshot; children cannot resolve their parent id.
            failed.insert(id);
            report.push(
                outcome(node, Disposition::Unchanged)
                    .with_error("existing group has no id".to_string()),
                observe,
            );
            return;
        };

        let attributes_changed = current.name != node.name
            || current.description != node.description
            || current.color != node.color;

        // The root is never re-parented.
        let parent_changed = match parsed.parent(id) {
            None => false,
            Some(parent_id) => {
                let wanted = parsed.node(parent_id).reference.as_str();
                let actual = existing
                    .parent(existing_id)
                    .map(|p| existing.node(p).reference.as_str());
                actual != Some(wanted)
            }
        };

        if !attributes_changed && !parent_changed {
            applied.insert(id, Applied::Remote(remote_id.clone()));
            report.push(
                outcome(node, Disposition::Unchanged).with_remote_id(remote_id),
                observe,
            );
            return;
        }

        let new_parent = if parent_changed {
            parent_remote
        } else {
            existing
                .parent(existing_id)
                .and_then(|p| existing.node(p).remote_id.clone())
        };
        let disposition = if parent_changed {
            Disposition::Moved
        } else {
            Disposition::Updated
        };
        debug!(reference = %node.reference, %disposition, "updating group");

        if self.options.dry_run {
            applied.insert(id, Applied::Remote(remote_id.clone()));
            report.push(outcome(node, disposition).with_remote_id(remote_id), observe);
            return;
        }

        let entity = group_entity(node, Some(remote_id.clone()), new_parent);
        match self.session.set_group(&entity).await {
            Ok(remote) => {
                applied.insert(id, Applied::Remote(remote.clone()));
                report.push(outcome(node, disposition).with_remote_id(remote), observe);
            }
            Err(e) => {
                // The entity still exists remotely; children can resolve it.
                applied.insert(id, Applied::Remote(remote_id.clone()));
                report.push(
                    outcome(node, disposition)
                        .with_remote_id(remote_id)
                        .with_error(e.to_string()),
                    observe,
                );
            }
        }
    }

    /// Bottom-up pass: deletions, children before parents.
    async fn delete_pass(
        &self,
        parsed: &GroupTree,
        existing: &GroupTree,
        report: &mut ImportReport,
        observe: &mut impl FnMut(&ImportOutcome),
    ) {
        let Some(existing_root) = existing.root() else {
            // The root subtree did not exist before this run; nothing can
            // be stale.
            return;
        };

        let mut deleted: HashSet<NodeId> = HashSet::new();
        // Lazily fetched before the first real candidate; a fetch failure
        // is remembered so it is not retried per node.
        let mut asset_cache: Option<Vec<AssetRef>> = None;
        let mut asset_error: Option<String> = None;

        for id in existing.post_order(existing_root) {
            if id == existing_root {
                continue;
            }
            let node = existing.node(id);
            if parsed.lookup(&node.reference).is_some() {
                // Kept; handled by the upsert pass.
                continue;
            }

            if !self.options.delete_empty_groups {
                report.push(
                    outcome(node, Disposition::Skipped(SkipReason::DeletionDisabled)),
                    observe,
                );
                continue;
            }

            let remaining_children = existing
                .children(id)
                .iter()
                .filter(|&&child| {
                    !deleted.contains(&child)
                        && parsed.lookup(&existing.node(child).reference).is_none()
                })
                .count();
            if remaining_children > 0 {
                report.push(
                    outcome(node, Disposition::Skipped(SkipReason::HasChildren)),
                    observe,
                );
                continue;
            }

            let Some(remote_id) = node.remote_id.clone() else {
                report.push(
                    outcome(node, Disposition::Skipped(SkipReason::AssetsUnknown))
                        .with_error("existing group has no id".to_string()),
                    observe,
                );
                continue;
            };

            if asset_cache.is_none() && asset_error.is_none() {
                match self.load_asset_refs().await {
                    Ok(list) => asset_cache = Some(list),
                    Err(e) => asset_error = Some(e.to_string()),
                }
            }
            let Some(asset_list) = asset_cache.as_mut() else {
                report.push(
                    outcome(node, Disposition::Skipped(SkipReason::AssetsUnknown))
                        .with_error(asset_error.clone().unwrap_or_default()),
                    observe,
                );
                continue;
            };

            let referencing: Vec<usize> = asset_list
                .iter()
                .enumerate()
                .filter(|(_, asset)| asset.references(&remote_id))
                .map(|(i, _)| i)
                .collect();

            if !referencing.is_empty() {
                let count = referencing.len();
                if !self.options.move_assets_up {
                    report.push(
                        outcome(node, Disposition::Skipped(SkipReason::HasAssets { count })),
                        observe,
                    );
                    continue;
                }

                let parent_remote = existing
                    .parent(id)
                    .and_then(|p| existing.node(p).remote_id.clone());
                if let Err(message) = self
                    .move_assets_up(asset_list, &referencing, &remote_id, parent_remote)
                    .await
                {
                    report.push(
                        outcome(node, Disposition::Skipped(SkipReason::HasAssets { count }))
                            .with_error(message),
                        observe,
                    );
                    continue;
                }
            }

            debug!(reference = %node.reference, "removing group");
            if self.options.dry_run {
                deleted.insert(id);
                report.push(
                    outcome(node, Disposition::Deleted).with_remote_id(remote_id),
                    observe,
                );
                continue;
            }

            let parent_remote = existing
                .parent(id)
                .and_then(|p| existing.node(p).remote_id.clone());
            let entity = group_entity(node, Some(remote_id.clone()), parent_remote);
            match self.session.remove_group(&entity).await {
                Ok(()) => {
                    deleted.insert(id);
                    report.push(
                        outcome(node, Disposition::Deleted).with_remote_id(remote_id),
                        observe,
                    );
                }
                Err(e) => {
                    report.push(
                        outcome(node, Disposition::Deleted)
                            .with_remote_id(remote_id)
                            .with_error(e.to_string()),
                        observe,
                    );
                }
            }
        }
    }

    /// Re-home every referencing asset from `group_id` to `parent_id`.
    ///
    /// Mutates the local asset view as calls succeed so later candidates
    /// see the new associations. Stops at the first failure.
    async fn move_assets_up(
        &self,
        assets: &mut [AssetRef],
        referencing: &[usize],
        group_id: &EntityId,
        parent_id: Option<EntityId>,
    ) -> Result<(), String> {
        for &index in referencing {
            let asset = &assets[index];
            let mut group_ids: Vec<EntityId> = asset
                .group_ids
                .iter()
                .filter(|g| *g != group_id)
                .cloned()
                .collect();
            if let Some(parent) = &parent_id {
                if !group_ids.contains(parent) {
                    group_ids.push(parent.clone());
                }
            }
            let updated = AssetRef {
                id: asset.id.clone(),
                class: asset.class,
                group_ids,
            };
            if !self.options.dry_run {
                self.session
                    .set_asset_groups(&updated)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            debug!(asset = %updated.id, class = %updated.class, "moved asset to parent group");
            assets[index] = updated;
        }
        Ok(())
    }

    /// One `Get` per asset class, fetched lazily before the first delete
    /// candidate is evaluated.
    async fn load_asset_refs(&self) -> ApiResult<Vec<AssetRef>> {
        let mut all = Vec::new();
        for class in AssetClass::ALL {
            all.extend(self.session.fetch_asset_refs(class).await?);
        }
        debug!(count = all.len(), "fetched asset references");
        Ok(all)
    }
}

fn outcome(node: &GroupNode, disposition: Disposition) -> ImportOutcome {
    ImportOutcome {
        reference: node.reference.clone(),
        name: node.name.clone(),
        disposition,
        remote_id: None,
        error: None,
    }
}

impl ImportOutcome {
    fn with_remote_id(mut self, id: EntityId) -> Self {
        self.remote_id = Some(id);
        self
    }

    fn with_error(mut self, message: String) -> Self {
        self.error = Some(message);
        self
    }
}

fn group_entity(node: &GroupNode, id: Option<EntityId>, parent_id: Option<EntityId>) -> Group {
    Group {
        id,
        name: node.name.clone(),
        reference: node.reference.clone(),
        description: node.description.clone(),
        color: node.color,
        parent_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(disposition: Disposition) -> ImportOutcome {
        ImportOutcome {
            reference: "R1".to_string(),
            name: "North".to_string(),
            disposition,
            remote_id: None,
            error: None,
        }
    }

    #[test]
    fn summary_counts_by_disposition() {
        let mut summary = ImportSummary::default();
        summary.record(&sample(Disposition::Added));
        summary.record(&sample(Disposition::Unchanged));
        summary.record(&sample(Disposition::Skipped(SkipReason::HasChildren)));

        assert_eq!(summary.added, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn summary_counts_errors_as_failed_only() {
        let mut summary = ImportSummary::default();
        summary.record(&sample(Disposition::Added).with_error("boom".to_string()));

        assert_eq!(summary.added, 0);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn disposition_display_includes_skip_reason() {
        let disposition = Disposition::Skipped(SkipReason::HasAssets { count: 2 });
        assert_eq!(disposition.to_string(), "skipped: has 2 associated asset(s)");
    }
}
