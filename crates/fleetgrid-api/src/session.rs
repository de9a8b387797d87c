//! The object-store seam consumed by the import tooling.

use async_trait::async_trait;

use crate::entities::{AssetClass, AssetRef, EntityId, Group};
use crate::error::ApiResult;

/// An authenticated session against the platform's object store.
///
/// Every method is a single remote call. Calls carry no transactional
/// semantics: each one succeeds or fails independently, and callers are
/// expected to record per-entity outcomes rather than roll back.
#[async_trait]
pub trait ApiSession: Send + Sync {
    /// Fetch every group visible to the session.
    async fn fetch_groups(&self) -> ApiResult<Vec<Group>>;

    /// Create a group and return its server-assigned id.
    ///
    /// `group.parent_id` must name an existing group, or be `None` to
    /// create directly under the platform root.
    async fn add_group(&self, group: &Group) -> ApiResult<EntityId>;

    /// Replace a stored group's attributes and parent link.
    async fn set_group(&self, group: &Group) -> ApiResult<EntityId>;

    /// Remove a group. The server rejects removal of groups that still
    /// have children or asset associations.
    async fn remove_group(&self, group: &Group) -> ApiResult<()>;

    /// Fetch the group references held by every asset of one class.
    async fn fetch_asset_refs(&self, class: AssetClass) -> ApiResult<Vec<AssetRef>>;

    /// Rewrite the group references of one asset.
    async fn set_asset_groups(&self, asset: &AssetRef) -> ApiResult<()>;
}
