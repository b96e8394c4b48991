//! Planner records owned by a tenant: calendars, tasks, contacts and
//! shopping lists.
//!
//! # Invariants
//! - Every planner record is tenant-required.
//! - `Calendar`, `Task` and `ShoppingList` hold a direct `space_id`;
//!   `Contact` does not belong to a space.

use crate::model::entity::{AuditFields, Entity, EntityId, EntityKind, ScopeCapability, TenantId};
use crate::model::tenancy::required_tenant;
use crate::persistence::record::{bool_to_int, int_to_bool, opt_int, opt_text, read_uuid, text, uuid_value};
use crate::repo::entity_repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Named calendar inside a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: TenantId,
    pub space_id: EntityId,
    pub name: String,
    /// `#rrggbb` display color.
    pub color: Option<String>,
}

impl Calendar {
    pub fn new(tenant_id: TenantId, space_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id,
            space_id,
            name: name.into(),
            color: None,
        }
    }
}

impl Entity for Calendar {
    const KIND: EntityKind = EntityKind::Calendar;
    const SCOPE: ScopeCapability = ScopeCapability::TenantRequired;
    const TABLE: &'static str = "calendars";
    const COLUMNS: &'static [&'static str] = &["space_id", "name", "color"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }

    fn space_ref(&self) -> Option<EntityId> {
        Some(self.space_id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.space_id),
            text(&self.name),
            opt_text(self.color.as_deref()),
        ]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id: required_tenant(tenant_id, Self::TABLE)?,
            space_id: read_uuid(row, Self::TABLE, "space_id")?,
            name: row.get("name")?,
            color: row.get("color")?,
        })
    }
}

/// Actionable item inside a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: TenantId,
    pub space_id: EntityId,
    pub title: String,
    pub notes: Option<String>,
    /// Unix epoch milliseconds.
    pub due_at: Option<i64>,
    /// 1 (highest) to 5 (lowest).
    pub priority: Option<i64>,
    pub completed: bool,
}

impl Task {
    pub fn new(tenant_id: TenantId, space_id: EntityId, title: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id,
            space_id,
            title: title.into(),
            notes: None,
            due_at: None,
            priority: None,
            completed: false,
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;
    const SCOPE: ScopeCapability = ScopeCapability::TenantRequired;
    const TABLE: &'static str = "tasks";
    const COLUMNS: &'static [&'static str] =
        &["space_id", "title", "notes", "due_at", "priority", "completed"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }

    fn space_ref(&self) -> Option<EntityId> {
        Some(self.space_id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            uuid_value(self.space_id),
            text(&self.title),
            opt_text(self.notes.as_deref()),
            opt_int(self.due_at),
            opt_int(self.priority),
            Value::Integer(bool_to_int(self.completed)),
        ]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id: required_tenant(tenant_id, Self::TABLE)?,
            space_id: read_uuid(row, Self::TABLE, "space_id")?,
            title: row.get("title")?,
            notes: row.get("notes")?,
            due_at: row.get("due_at")?,
            priority: row.get("priority")?,
            completed: int_to_bool(row.get("completed")?, Self::TABLE, "completed")?,
        })
    }
}

/// Address book entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: TenantId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id,
            first_name: None,
            last_name: None,
            email: None,
            phone: None,
        }
    }
}

impl Entity for Contact {
    const KIND: EntityKind = EntityKind::Contact;
    const SCOPE: ScopeCapability = ScopeCapability::TenantRequired;
    const TABLE: &'static str = "contacts";
    const COLUMNS: &'static [&'static str] = &["first_name", "last_name", "email", "phone"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            opt_text(self.first_name.as_deref()),
            opt_text(self.last_name.as_deref()),
            opt_text(self.email.as_deref()),
            opt_text(self.phone.as_deref()),
        ]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id: required_tenant(tenant_id, Self::TABLE)?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
        })
    }
}

/// Shopping list shared inside a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: TenantId,
    pub space_id: EntityId,
    pub name: String,
}

impl ShoppingList {
    pub fn new(tenant_id: TenantId, space_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id,
            space_id,
            name: name.into(),
        }
    }
}

impl Entity for ShoppingList {
    const KIND: EntityKind = EntityKind::ShoppingList;
    const SCOPE: ScopeCapability = ScopeCapability::TenantRequired;
    const TABLE: &'static str = "shopping_lists";
    const COLUMNS: &'static [&'static str] = &["space_id", "name"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }

    fn space_ref(&self) -> Option<EntityId> {
        Some(self.space_id)
    }

    fn column_values(&self) -> Vec<Value> {
        vec![uuid_value(self.space_id), text(&self.name)]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id: required_tenant(tenant_id, Self::TABLE)?,
            space_id: read_uuid(row, Self::TABLE, "space_id")?,
            name: row.get("name")?,
        })
    }
}
