//! Query scope compiler.
//!
//! # Responsibility
//! - Derive the read predicate (soft delete + tenant visibility) for one
//!   entity kind and one caller.
//! - Render it as a SQLite `WHERE` fragment or evaluate it in memory.
//!
//! # Invariants
//! - `QueryScope::Scoped` always filters out soft-deleted rows.
//! - A caller without a resolved tenant gets no tenant predicate at all.
//!   Such a caller sees rows of every tenant.
//! - `QueryScope::Bypass` drops both predicates and is never the default.

use crate::model::entity::{ScopeCapability, TenantId};
use rusqlite::types::Value;

/// Per-query filter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryScope {
    /// Soft-delete and tenant predicates apply.
    #[default]
    Scoped,
    /// Administrative recovery/test reads: no predicates.
    Bypass,
}

/// Tenant part of a compiled scope predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantClause {
    Unrestricted,
    /// `tenant_id = caller`
    Equals(TenantId),
    /// `tenant_id = caller OR tenant_id IS NULL`
    EqualsOrShared(TenantId),
}

/// Compiled read predicate for one entity kind and caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeFilter {
    pub exclude_deleted: bool,
    pub tenant: TenantClause,
}

impl ScopeFilter {
    pub const UNFILTERED: ScopeFilter = ScopeFilter {
        exclude_deleted: false,
        tenant: TenantClause::Unrestricted,
    };

    /// Renders the predicate as a SQL fragment plus positional bind values.
    ///
    /// The fragment is always a valid boolean expression (`1 = 1` when empty),
    /// so callers can append it with `AND`.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<&str> = Vec::new();
        let mut bind_values = Vec::new();

        if self.exclude_deleted {
            clauses.push("deleted_at IS NULL");
        }

        match self.tenant {
            TenantClause::Unrestricted => {}
            TenantClause::Equals(tenant_id) => {
                clauses.push("tenant_id = ?");
                bind_values.push(Value::Text(tenant_id.to_string()));
            }
            TenantClause::EqualsOrShared(tenant_id) => {
                clauses.push("(tenant_id = ? OR tenant_id IS NULL)");
                bind_values.push(Value::Text(tenant_id.to_string()));
            }
        }

        if clauses.is_empty() {
            return ("1 = 1".to_string(), bind_values);
        }
        (clauses.join(" AND "), bind_values)
    }

    /// Evaluates the predicate against one row's scope columns.
    pub fn admits(&self, tenant_id: Option<TenantId>, deleted_at: Option<i64>) -> bool {
        if self.exclude_deleted && deleted_at.is_some() {
            return false;
        }

        match self.tenant {
            TenantClause::Unrestricted => true,
            TenantClause::Equals(caller) => tenant_id == Some(caller),
            TenantClause::EqualsOrShared(caller) => tenant_id.is_none() || tenant_id == Some(caller),
        }
    }
}

/// Compiles the read predicate for one entity capability and caller.
pub fn compile_scope(
    capability: ScopeCapability,
    caller_tenant: Option<TenantId>,
    mode: QueryScope,
) -> ScopeFilter {
    if mode == QueryScope::Bypass {
        return ScopeFilter::UNFILTERED;
    }

    let tenant = match (capability, caller_tenant) {
        (_, None) | (ScopeCapability::Unscoped, _) => TenantClause::Unrestricted,
        (ScopeCapability::TenantRequired, Some(caller)) => TenantClause::Equals(caller),
        (ScopeCapability::TenantOptional, Some(caller)) => TenantClause::EqualsOrShared(caller),
    };

    ScopeFilter {
        exclude_deleted: true,
        tenant,
    }
}
