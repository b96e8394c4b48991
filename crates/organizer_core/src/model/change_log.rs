//! Append-only change ledger rows.
//!
//! # Invariants
//! - Entries are inserted once and never updated or deleted.
//! - All entries produced by one commit share the same `timestamp`.

use crate::model::entity::{EntityId, EntityKind, TenantId};
use crate::persistence::registry::ChangeType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger operation recorded for one tracked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Created,
    Updated,
    Deleted,
}

impl ChangeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One immutable ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub change_type: ChangeType,
    pub entity_id: EntityId,
    pub operation: ChangeOperation,
    pub tenant_id: Option<TenantId>,
    pub space_id: Option<EntityId>,
    /// Commit instant in Unix epoch milliseconds.
    pub timestamp: i64,
}

impl ChangeLogEntry {
    /// Kind tag of the ledger itself. It has no change type mapping.
    pub const KIND: EntityKind = EntityKind::ChangeLog;
    pub const TABLE: &'static str = "change_log";
}
