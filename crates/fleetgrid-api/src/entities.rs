//! Wire entities for the fleetgrid platform.
//!
//! Only the fields the import tooling reads or writes are modeled. Asset
//! classes are flattened to [`AssetRef`], which carries nothing but the
//! group references an asset holds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque server-assigned entity identifier.
///
/// Distinct from a group's `reference`, which is a user-assigned key that
/// stays stable across imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An organizational group as stored by the platform.
///
/// Groups form a tree: every group except the platform's top-level one has
/// exactly one parent. `id` is absent on entities that have not been
/// stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    /// User-assigned stable key identifying the group across imports.
    /// May be empty for groups managed outside the import tooling.
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub description: String,
    /// Display color as a packed RGB integer.
    #[serde(default)]
    pub color: i32,
    /// Parent group; `None` for groups directly under the platform root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
}

impl Group {
    /// A new, not-yet-stored group.
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            reference: reference.into(),
            description: String::new(),
            color: 0,
            parent_id: None,
        }
    }
}

/// Asset classes that may reference groups.
///
/// A group referenced by any asset of these classes is not empty and
/// cannot be deleted without first moving the associations away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetClass {
    Device,
    User,
    Driver,
    Rule,
    Zone,
    ScheduledReport,
}

impl AssetClass {
    /// Every asset class, in the order they are checked.
    pub const ALL: [AssetClass; 6] = [
        AssetClass::Device,
        AssetClass::User,
        AssetClass::Driver,
        AssetClass::Rule,
        AssetClass::Zone,
        AssetClass::ScheduledReport,
    ];

    /// Wire type name used in `Get`/`Set` calls.
    pub fn type_name(self) -> &'static str {
        match self {
            AssetClass::Device => "Device",
            AssetClass::User => "User",
            AssetClass::Driver => "Driver",
            AssetClass::Rule => "Rule",
            AssetClass::Zone => "Zone",
            AssetClass::ScheduledReport => "ScheduledReport",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Device => write!(f, "device"),
            AssetClass::User => write!(f, "user"),
            AssetClass::Driver => write!(f, "driver"),
            AssetClass::Rule => write!(f, "rule"),
            AssetClass::Zone => write!(f, "zone"),
            AssetClass::ScheduledReport => write!(f, "scheduled report"),
        }
    }
}

/// The slice of an asset entity the import tooling needs: its identity
/// and which groups it references.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRef {
    pub id: EntityId,
    pub class: AssetClass,
    /// Groups this asset directly references.
    pub group_ids: Vec<EntityId>,
}

impl AssetRef {
    pub fn new(id: impl Into<EntityId>, class: AssetClass, group_ids: Vec<EntityId>) -> Self {
        Self {
            id: id.into(),
            class,
            group_ids,
        }
    }

    /// Whether this asset references the given group.
    pub fn references(&self, group_id: &EntityId) -> bool {
        self.group_ids.contains(group_id)
    }
}
