//! In-memory `ApiSession` for reconciler tests.
//!
//! Stores groups and assets behind a mutex, records every call in order,
//! and enforces the server-side rule that a group with children or asset
//! associations cannot be removed. Individual operations can be made to
//! fail per reference to exercise partial-failure paths.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use fleetgrid_api::{ApiError, ApiResult, ApiSession, AssetClass, AssetRef, EntityId, Group};

#[derive(Default)]
struct State {
    groups: Vec<Group>,
    assets: Vec<AssetRef>,
    next_id: u64,
    calls: Vec<String>,
    fail_add: HashSet<String>,
    fail_set: HashSet<String>,
    fail_remove: HashSet<String>,
}

impl State {
    fn alloc_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId::new(format!("b{}", self.next_id))
    }

    fn has_group(&self, id: &EntityId) -> bool {
        self.groups.iter().any(|g| g.id.as_ref() == Some(id))
    }
}

#[derive(Default)]
pub struct MemorySession {
    state: Mutex<State>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a group directly, without going through (or logging) a call.
    pub fn seed_group(
        &self,
        name: &str,
        reference: &str,
        parent_id: Option<&EntityId>,
        color: i32,
        description: &str,
    ) -> EntityId {
        let mut state = self.state.lock().unwrap();
        let id = state.alloc_id();
        state.groups.push(Group {
            id: Some(id.clone()),
            name: name.to_string(),
            reference: reference.to_string(),
            description: description.to_string(),
            color,
            parent_id: parent_id.cloned(),
        });
        id
    }

    /// Store an asset referencing the given groups.
    pub fn seed_asset(&self, class: AssetClass, group_ids: Vec<EntityId>) -> EntityId {
        let mut state = self.state.lock().unwrap();
        let id = EntityId::new(format!("{}-{}", class.type_name().to_lowercase(), {
            state.next_id += 1;
            state.next_id
        }));
        state.assets.push(AssetRef {
            id: id.clone(),
            class,
            group_ids,
        });
        id
    }

    pub fn fail_add(&self, reference: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_add
            .insert(reference.to_string());
    }

    pub fn fail_set(&self, reference: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_set
            .insert(reference.to_string());
    }

    pub fn fail_remove(&self, reference: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_remove
            .insert(reference.to_string());
    }

    /// Every call made, in order, e.g. `add:N1` or `get:Group`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that mutate store state (everything but `get:`).
    pub fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("get:"))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn groups(&self) -> Vec<Group> {
        self.state.lock().unwrap().groups.clone()
    }

    pub fn group_by_reference(&self, reference: &str) -> Option<Group> {
        self.state
            .lock()
            .unwrap()
            .groups
            .iter()
            .find(|g| g.reference == reference)
            .cloned()
    }

    pub fn assets(&self) -> Vec<AssetRef> {
        self.state.lock().unwrap().assets.clone()
    }

    fn server_error(message: &str) -> ApiError {
        ApiError::Server {
            code: 500,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ApiSession for MemorySession {
    async fn fetch_groups(&self) -> ApiResult<Vec<Group>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get:Group".to_string());
        Ok(state.groups.clone())
    }

    async fn add_group(&self, group: &Group) -> ApiResult<EntityId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("add:{}", group.reference));
        if state.fail_add.contains(&group.reference) {
            return Err(Self::server_error("injected add failure"));
        }
        if let Some(parent) = &group.parent_id {
            if !state.has_group(parent) {
                return Err(ApiError::Server {
                    code: 400,
                    message: format!("unknown parent group '{parent}'"),
                });
            }
        }
        let id = state.alloc_id();
        let mut stored = group.clone();
        stored.id = Some(id.clone());
        state.groups.push(stored);
        Ok(id)
    }

    async fn set_group(&self, group: &Group) -> ApiResult<EntityId> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set:{}", group.reference));
        if state.fail_set.contains(&group.reference) {
            return Err(Self::server_error("injected set failure"));
        }
        let id = group
            .id
            .clone()
            .ok_or_else(|| Self::server_error("set without id"))?;
        let stored = state
            .groups
            .iter_mut()
            .find(|g| g.id.as_ref() == Some(&id))
            .ok_or_else(|| Self::server_error("no such group"))?;
        *stored = group.clone();
        Ok(id)
    }

    async fn remove_group(&self, group: &Group) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("remove:{}", group.reference));
        if state.fail_remove.contains(&group.reference) {
            return Err(Self::server_error("injected remove failure"));
        }
        let id = group
            .id
            .clone()
            .ok_or_else(|| Self::server_error("remove without id"))?;
        let has_children = state.groups.iter().any(|g| g.parent_id.as_ref() == Some(&id));
        let has_assets = state.assets.iter().any(|a| a.references(&id));
        if has_children || has_assets {
            return Err(ApiError::Server {
                code: 409,
                message: format!("group '{}' is not empty", group.reference),
            });
        }
        state.groups.retain(|g| g.id.as_ref() != Some(&id));
        Ok(())
    }

    async fn fetch_asset_refs(&self, class: AssetClass) -> ApiResult<Vec<AssetRef>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get:{}", class.type_name()));
        Ok(state
            .assets
            .iter()
            .filter(|a| a.class == class)
            .cloned()
            .collect())
    }

    async fn set_asset_groups(&self, asset: &AssetRef) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set-asset:{}", asset.id));
        let stored = state
            .assets
            .iter_mut()
            .find(|a| a.id == asset.id)
            .ok_or_else(|| Self::server_error("no such asset"))?;
        *stored = asset.clone();
        Ok(())
    }
}
