//! Reference data: categories (optionally tenant-owned) and holidays
//! (global).

use crate::model::entity::{AuditFields, Entity, EntityKind, ScopeCapability, TenantId};
use crate::persistence::record::{opt_text, text};
use crate::repo::entity_repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Task/contact category.
///
/// `tenant_id = None` marks a system-defined category visible to every tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub tenant_id: Option<TenantId>,
    pub name: String,
}

impl Category {
    /// Creates a category owned by one tenant.
    pub fn owned(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id: Some(tenant_id),
            name: name.into(),
        }
    }

    /// Creates a system-defined category shared by all tenants.
    pub fn shared(name: impl Into<String>) -> Self {
        Self {
            audit: AuditFields::new(),
            tenant_id: None,
            name: name.into(),
        }
    }
}

impl Entity for Category {
    const KIND: EntityKind = EntityKind::Category;
    const SCOPE: ScopeCapability = ScopeCapability::TenantOptional;
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["name"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    fn column_values(&self) -> Vec<Value> {
        vec![text(&self.name)]
    }

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            tenant_id,
            name: row.get("name")?,
        })
    }
}

/// Public holiday shown on every calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    #[serde(flatten)]
    pub audit: AuditFields,
    pub name: String,
    /// Unix epoch milliseconds at local midnight.
    pub observed_on: i64,
    /// ISO 3166-1 alpha-2 region, `None` for worldwide.
    pub region: Option<String>,
}

impl Holiday {
    pub fn new(name: impl Into<String>, observed_on: i64) -> Self {
        Self {
            audit: AuditFields::new(),
            name: name.into(),
            observed_on,
            region: None,
        }
    }
}

impl Entity for Holiday {
    const KIND: EntityKind = EntityKind::Holiday;
    const SCOPE: ScopeCapability = ScopeCapability::Unscoped;
    const TABLE: &'static str = "holidays";
    const COLUMNS: &'static [&'static str] = &["name", "observed_on", "region"];

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            text(&self.name),
            Value::Integer(self.observed_on),
            opt_text(self.region.as_deref()),
        ]
    }

    fn from_row(audit: AuditFields, _tenant_id: Option<TenantId>, row: &Row<'_>) -> RepoResult<Self> {
        Ok(Self {
            audit,
            name: row.get("name")?,
            observed_on: row.get("observed_on")?,
            region: row.get("region")?,
        })
    }
}
