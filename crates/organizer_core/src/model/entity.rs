//! Base record shape and tenant scope capabilities.
//!
//! # Responsibility
//! - Define the audit fields every persisted organizer record carries.
//! - Classify each entity kind as tenant-required, tenant-optional or unscoped.
//! - Describe how a typed entity maps onto its SQLite table.
//!
//! # Invariants
//! - `id` is assigned once at creation and never changes.
//! - `created_at`/`updated_at` are written by the commit pipeline only.
//! - `deleted_at` is monotonic: once set it is never cleared.
//! - Scope capability is a compile-time constant per entity type.
//!
//! # See also
//! - `persistence::scope` for the read-side use of `ScopeCapability`.

use crate::repo::entity_repo::RepoResult;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// Stable identifier of any persisted organizer record.
pub type EntityId = Uuid;

/// Identifier of the top-level isolation boundary.
pub type TenantId = Uuid;

/// Pipeline-owned identity and lifecycle fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub id: EntityId,
    /// Unix epoch milliseconds. Zero until the first commit.
    pub created_at: i64,
    /// Unix epoch milliseconds. Zero until the first commit.
    pub updated_at: i64,
    /// Soft delete tombstone in Unix epoch milliseconds.
    pub deleted_at: Option<i64>,
}

impl AuditFields {
    /// Creates audit fields with a freshly generated identity.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Creates audit fields for a caller-provided identity.
    ///
    /// A nil id means "not yet assigned"; the repository assigns one on create.
    pub fn with_id(id: EntityId) -> Self {
        Self {
            id,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_identity(&self) -> bool {
        !self.id.is_nil()
    }
}

impl Default for AuditFields {
    fn default() -> Self {
        Self::with_id(Uuid::nil())
    }
}

/// Tenant dimension of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeCapability {
    /// Non-nullable tenant column, always filtered to the caller's tenant.
    TenantRequired,
    /// Nullable tenant column; null rows are shared by every tenant.
    TenantOptional,
    /// No tenant column at all.
    Unscoped,
}

impl ScopeCapability {
    pub fn has_tenant_column(self) -> bool {
        !matches!(self, Self::Unscoped)
    }
}

/// Closed set of persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tenant,
    User,
    Space,
    Calendar,
    Task,
    Contact,
    ShoppingList,
    Category,
    Holiday,
    ChangeLog,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::User => "user",
            Self::Space => "space",
            Self::Calendar => "calendar",
            Self::Task => "task",
            Self::Contact => "contact",
            Self::ShoppingList => "shopping_list",
            Self::Category => "category",
            Self::Holiday => "holiday",
            Self::ChangeLog => "change_log",
        }
    }
}

/// Typed persisted entity with its table mapping.
///
/// Implementors describe only their payload columns; the shared columns
/// (`id`, optional `tenant_id`, `created_at`, `updated_at`, `deleted_at`) are
/// handled by the persistence layer.
pub trait Entity: Clone + Debug + Send + 'static {
    const KIND: EntityKind;
    const SCOPE: ScopeCapability;
    const TABLE: &'static str;
    /// Payload columns in the order produced by `column_values`.
    const COLUMNS: &'static [&'static str];

    fn audit(&self) -> &AuditFields;
    fn audit_mut(&mut self) -> &mut AuditFields;

    /// Owning tenant. Only meaningful when `SCOPE` has a tenant column.
    fn tenant_id(&self) -> Option<TenantId> {
        None
    }

    /// Direct space association, if the kind holds one.
    fn space_ref(&self) -> Option<EntityId> {
        None
    }

    fn column_values(&self) -> Vec<Value>;

    fn from_row(audit: AuditFields, tenant_id: Option<TenantId>, row: &Row<'_>)
        -> RepoResult<Self>;

    fn id(&self) -> EntityId {
        self.audit().id
    }

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted()
    }
}
