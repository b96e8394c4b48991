//! Generic scoped repository over any `Entity`.
//!
//! # Responsibility
//! - Provide get/list/create/update/soft-delete for every entity kind.
//! - Route reads through the query scope compiler and writes through the
//!   commit pipeline.
//!
//! # Invariants
//! - Reads never return soft-deleted rows or other tenants' rows unless the
//!   caller explicitly opts into `unfiltered()`.
//! - "Deleted", "other tenant" and "never existed" are indistinguishable to
//!   scoped callers.
//! - Writes never hard-delete; `soft_delete` sets `deleted_at`.
//! - Writes never place a record outside the caller's tenant scope, and
//!   `update` never changes a record's tenant.

use crate::db::DbError;
use crate::model::entity::{Entity, EntityId, TenantId};
use crate::persistence::data_context::{CommitReceipt, DataContext};
use crate::persistence::interceptor::InterceptorError;
use crate::persistence::record::{select_all, select_one};
use crate::persistence::scope::{compile_scope, QueryScope, ScopeFilter};
use crate::persistence::unit_of_work::AlreadyTracked;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository and commit pipeline error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(EntityId),
    /// The write would place the record under a tenant the caller may not use.
    ForeignTenant {
        id: EntityId,
        tenant_id: Option<TenantId>,
    },
    InvalidData(String),
    /// The interceptor chain aborted the commit; nothing was written.
    Commit(InterceptorError),
    Tracking(AlreadyTracked),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::ForeignTenant { id, tenant_id } => match tenant_id {
                Some(tenant_id) => write!(f, "record {id} cannot be written to tenant {tenant_id}"),
                None => write!(f, "record {id} cannot be written without a tenant"),
            },
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Commit(err) => write!(f, "commit aborted: {err}"),
            Self::Tracking(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Commit(err) => Some(err),
            Self::Tracking(err) => Some(err),
            Self::NotFound(_)
            | Self::ForeignTenant { .. }
            | Self::InvalidData(_)
            | Self::InconsistentState(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<InterceptorError> for RepoError {
    fn from(value: InterceptorError) -> Self {
        Self::Commit(value)
    }
}

impl From<AlreadyTracked> for RepoError {
    fn from(value: AlreadyTracked) -> Self {
        Self::Tracking(value)
    }
}

/// CRUD façade for one entity type.
pub struct Repository<'ctx, 'conn, E: Entity> {
    ctx: &'ctx DataContext<'conn>,
    _entity: PhantomData<fn() -> E>,
}

impl<'ctx, 'conn, E: Entity> Repository<'ctx, 'conn, E> {
    pub fn new(ctx: &'ctx DataContext<'conn>) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }

    fn scoped_filter(&self) -> ScopeFilter {
        compile_scope(E::SCOPE, self.ctx.caller_tenant(), QueryScope::Scoped)
    }

    /// Gets one visible record by id.
    pub fn get(&self, id: EntityId) -> RepoResult<Option<E>> {
        select_one(self.ctx.connection(), &self.scoped_filter(), id)
    }

    /// Lists every visible record. Order is unspecified.
    pub fn list(&self) -> RepoResult<Vec<E>> {
        select_all(self.ctx.connection(), &self.scoped_filter())
    }

    /// Opt-in view that ignores soft-delete and tenant predicates.
    ///
    /// Reserved for administrative recovery and tests.
    pub fn unfiltered(&self) -> UnfilteredQuery<'ctx, 'conn, E> {
        UnfilteredQuery {
            ctx: self.ctx,
            _entity: PhantomData,
        }
    }

    /// Inserts a new record and returns it with audit fields populated.
    ///
    /// A nil id is replaced with a generated one.
    ///
    /// # Errors
    /// - `RepoError::ForeignTenant` when the record's tenant would not be
    ///   visible to the caller.
    pub fn create(&self, mut entity: E) -> RepoResult<E> {
        if !entity.audit().has_identity() {
            entity.audit_mut().id = Uuid::new_v4();
        }
        let id = entity.id();
        if !self.scoped_filter().admits(entity.tenant_id(), None) {
            return Err(RepoError::ForeignTenant {
                id,
                tenant_id: entity.tenant_id(),
            });
        }

        let mut uow = self.ctx.begin();
        uow.add(entity)?;
        self.ctx.commit(uow)?;
        self.read_back(id, "created record not found in read-back")
    }

    /// Persists changes to a visible record and returns the stored state.
    ///
    /// `created_at` always keeps its stored value.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when the stored record is not visible.
    /// - `RepoError::ForeignTenant` when `entity` carries another tenant.
    pub fn update(&self, entity: &E) -> RepoResult<E> {
        let id = entity.id();
        let original = self.get(id)?.ok_or(RepoError::NotFound(id))?;
        if entity.tenant_id() != original.tenant_id() {
            return Err(RepoError::ForeignTenant {
                id,
                tenant_id: entity.tenant_id(),
            });
        }

        let mut current = entity.clone();
        current.audit_mut().created_at = original.audit().created_at;

        let mut uow = self.ctx.begin();
        uow.modify(&original, current)?;
        self.ctx.commit(uow)?;
        self.read_back(id, "updated record not found in read-back")
    }

    /// Soft-deletes a visible record.
    ///
    /// Returns `false` when the scoped lookup finds nothing, which includes
    /// records that are already deleted.
    pub fn soft_delete(&self, id: EntityId) -> RepoResult<bool> {
        Ok(self.soft_delete_with_receipt(id)?.is_some())
    }

    /// Like `soft_delete`, returning the commit receipt when a row was deleted.
    pub fn soft_delete_with_receipt(&self, id: EntityId) -> RepoResult<Option<CommitReceipt>> {
        let Some(original) = self.get(id)? else {
            return Ok(None);
        };

        let mut uow = self.ctx.begin();
        let mut current = original.clone();
        current.audit_mut().deleted_at = Some(uow.now());
        uow.modify(&original, current)?;
        Ok(Some(self.ctx.commit(uow)?))
    }

    fn read_back(&self, id: EntityId, details: &'static str) -> RepoResult<E> {
        select_one(self.ctx.connection(), &ScopeFilter::UNFILTERED, id)?
            .ok_or(RepoError::InconsistentState(details))
    }
}

/// Administrative read view with every scope predicate disabled.
pub struct UnfilteredQuery<'ctx, 'conn, E: Entity> {
    ctx: &'ctx DataContext<'conn>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> UnfilteredQuery<'_, '_, E> {
    fn filter(&self) -> ScopeFilter {
        compile_scope(E::SCOPE, self.ctx.caller_tenant(), QueryScope::Bypass)
    }

    pub fn get(&self, id: EntityId) -> RepoResult<Option<E>> {
        select_one(self.ctx.connection(), &self.filter(), id)
    }

    pub fn list(&self) -> RepoResult<Vec<E>> {
        select_all(self.ctx.connection(), &self.filter())
    }
}
