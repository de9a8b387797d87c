//! Builds the parsed and existing group trees under a designated root.
//!
//! The parsed tree comes from import-file rows processed in file order;
//! the existing tree is a one-shot snapshot of every group fetched from
//! the remote store.

use fleetgrid_api::{ApiResult, ApiSession, EntityId, Group};
use tracing::{debug, warn};

use crate::row::{create_dictionary, RowError, RowHandler};
use crate::tree::{GroupNode, GroupTree, NodeId};

/// One data line of a group import file.
///
/// Column order: parent name, parent reference, child name, child
/// reference, color, description.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub parent_name: String,
    pub parent_reference: String,
    pub child_name: String,
    pub child_reference: String,
    pub color: i32,
    pub description: String,
}

impl GroupRow {
    pub fn from_record(record: &csv::StringRecord) -> Result<Self, RowError> {
        if record.len() < 6 {
            return Err(RowError::FieldCount {
                expected: 6,
                found: record.len(),
            });
        }

        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        let child_name = field(2);
        if child_name.is_empty() {
            return Err(RowError::Field {
                field: "child name",
                message: "must not be empty".to_string(),
            });
        }

        let color_field = field(4);
        let color = if color_field.is_empty() {
            0
        } else {
            color_field.parse::<i32>().map_err(|_| RowError::Field {
                field: "color",
                message: format!("'{color_field}' is not a number"),
            })?
        };

        Ok(Self {
            parent_name: field(0),
            parent_reference: field(1),
            child_name,
            child_reference: field(3),
            color,
            description: field(5),
        })
    }
}

/// Which parent association wins when a child reference appears more than
/// once in one input file.
///
/// Attribute values are last-write-wins either way; the policy only
/// decides whether a later row may re-parent the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReparentPolicy {
    /// The last row naming the reference decides the parent.
    #[default]
    LastWins,
    /// The first row naming the reference decides the parent; later rows
    /// only update attributes.
    FirstWins,
}

/// Builds the parsed tree from import rows.
///
/// Rows are processed in file order. A row's parent must already exist in
/// the tree, except that the first appearance of the root reference
/// synthesizes the root node. Without a configured root reference, the
/// first data row's parent becomes the root ("first-line parent").
#[derive(Debug)]
pub struct TreeBuilder {
    tree: GroupTree,
    root_reference: Option<String>,
    policy: ReparentPolicy,
}

impl TreeBuilder {
    pub fn new(root_reference: Option<String>) -> Self {
        Self {
            tree: GroupTree::new(),
            root_reference,
            policy: ReparentPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReparentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The effective root reference, once known.
    pub fn root_reference(&self) -> Option<&str> {
        self.root_reference.as_deref()
    }

    pub fn tree(&self) -> &GroupTree {
        &self.tree
    }

    pub fn into_tree(self) -> GroupTree {
        self.tree
    }
}

impl RowHandler for TreeBuilder {
    type Item = NodeId;

    fn handle(&mut self, record: &csv::StringRecord) -> Result<NodeId, RowError> {
        let row = GroupRow::from_record(record)?;

        let root_reference = self
            .root_reference
            .get_or_insert_with(|| row.parent_reference.clone())
            .clone();

        let parent = match self.tree.lookup(&row.parent_reference) {
            Some(id) => id,
            None if row.parent_reference == root_reference && self.tree.root().is_none() => {
                let root = self.tree.insert(
                    GroupNode::new(&row.parent_name, &row.parent_reference),
                    None,
                );
                self.tree.set_root(root);
                debug!(reference = %row.parent_reference, "synthesized root group");
                root
            }
            None => return Err(RowError::UnknownParent(row.parent_reference)),
        };

        match self.tree.lookup(&row.child_reference) {
            Some(existing) => {
                // Repeated reference: update in place.
                let reparent = self.policy == ReparentPolicy::LastWins
                    && self.tree.root() != Some(existing)
                    && self.tree.parent(existing) != Some(parent);
                if reparent && self.tree.is_ancestor(existing, parent) {
                    return Err(RowError::CycleDetected {
                        child: row.child_reference,
                        parent: row.parent_reference,
                    });
                }
                let node = self.tree.node_mut(existing);
                node.name = row.child_name;
                node.description = row.description;
                node.color = row.color;
                if reparent {
                    self.tree.reparent(existing, parent);
                }
                Ok(existing)
            }
            None => {
                let node = GroupNode::new(&row.child_name, &row.child_reference)
                    .with_attributes(row.description, row.color);
                Ok(self.tree.insert(node, Some(parent)))
            }
        }
    }
}

/// Fetch every group from the store and assemble the existing tree.
///
/// The snapshot is taken once per run; staleness during the run is not
/// re-validated.
pub async fn fetch_existing_tree(
    session: &dyn ApiSession,
    root_reference: &str,
) -> ApiResult<GroupTree> {
    let groups = session.fetch_groups().await?;
    debug!(count = groups.len(), "fetched existing groups");
    Ok(existing_tree_from_groups(groups, root_reference))
}

/// Assemble the existing-tree arena from a flat group list.
///
/// Parent links are resolved by entity id; groups whose parent is unknown
/// (or whose parent chain would loop) stay parentless. Duplicate
/// references land in the tree's non-unique side table and are reported
/// as warnings.
pub fn existing_tree_from_groups(groups: Vec<Group>, root_reference: &str) -> GroupTree {
    let mut tree = GroupTree::new();
    let mut inserted: Vec<(Option<EntityId>, Option<EntityId>, NodeId)> =
        Vec::with_capacity(groups.len());

    for group in groups {
        let mut node = GroupNode::new(group.name, group.reference)
            .with_attributes(group.description, group.color);
        node.remote_id = group.id.clone();
        let id = tree.insert(node, None);
        inserted.push((group.id, group.parent_id, id));
    }

    let (by_entity, duplicate_ids) = create_dictionary(
        inserted.iter().map(|(id, _, node)| (id.clone(), *node)),
        |(id, _)| id.clone(),
    );
    for id in duplicate_ids.keys() {
        warn!(%id, "groups share an entity id; only the first is linked");
    }

    for (_, parent_id, node) in &inserted {
        let Some(&(_, parent)) = parent_id.as_ref().and_then(|p| by_entity.get(p)) else {
            continue;
        };
        if tree.is_ancestor(*node, parent) {
            warn!(
                reference = %tree.node(*node).reference,
                "group's parent chain loops back on itself; left parentless"
            );
            continue;
        }
        tree.reparent(*node, parent);
    }

    for (reference, duplicates) in tree.non_unique() {
        warn!(
            %reference,
            count = duplicates.len() + 1,
            "groups share a reference; only the first is considered for matching"
        );
    }

    if let Some(root) = tree.lookup(root_reference) {
        tree.set_root(root);
    }

    tree
}
