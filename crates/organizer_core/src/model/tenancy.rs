//! Tenant, user and space records.
//!
//! # Invariants
//! - `Tenant` has no tenant dimension; its own id is its tenant.
//! - `User` and `Space` always belong to exactly one tenant.

use crate::model::entity::{AuditFields, Entity, EntityKind, ScopeCapability, TenantId};
use crate::persistence::record::{opt_text, text};
use crate::repo::entity_repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Top-level isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub name: String,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            name: name.into(),
        }
    }
}

impl Entity for Tenant {
    const KIND: EntityKind = EntityKind::Tenant;
    const SCOPE: ScopeCapability = ScopeCapability::Unscoped;
    const TABLE: &'static str = "tenants";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn column_values(&self) -> Vec<Value> {
        vec![text(&self.name)]
    }

    fn from_row(audit: AuditFields, _tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            name: row.get("name")?,
        })
    }
}

/// Person signed in to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: TenantId,
    pub email: String,
    pub display_name: Option<String>,
}

impl User {
    pub fn new(tenant_id: TenantId, email: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id,
            email: email.into(),
            display_name: None,
        }
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;
    const SCOPE: ScopeCapability = ScopeCapability::TenantRequired;
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "display_name"];

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
        vec![text(&self.email), opt_text(self.display_name.as_deref())]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id: required_tenant(tenant_id, Self::TABLE)?,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
        })
    }
}

/// Shared workspace inside a tenant that groups calendars, tasks and lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: TenantId,
    pub name: String,
}

impl Space {
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id,
            name: name.into(),
        }
    }
}

impl Entity for Space {
    const KIND: EntityKind = EntityKind::Space;
    const SCOPE: ScopeCapability = ScopeCapability::TenantRequired;
    const TABLE: &'static str = "spaces";
    const COLUMNS: &'static [&'static str] = &["name"];

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
        vec![text(&self.name)]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id: required_tenant(tenant_id, Self::TABLE)?,
            name: row.get("name")?,
        })
    }
}

pub(crate) fn required_tenant(
    tenant_id: Option<TenantId>,
    table: &'static str,
) -> RepoResult<TenantId> {
    tenant_id.ok_or_else(|| RepoError::InvalidData(format!("missing tenant_id in {table}.tenant_id")))
}
