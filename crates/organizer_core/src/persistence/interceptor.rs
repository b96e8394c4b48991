//! Pre-commit interceptor chain.
//!
//! # Responsibility
//! - Stamp audit timestamps on tracked records.
//! - Append one ledger entry per loggable tracked change.
//!
//! # Invariants
//! - Audit stamping always runs before change-log emission.
//! - Both passes use the unit of work's single `now`.
//! - Any interceptor error aborts the whole commit; nothing is written.
//! - Ledger entries are only appended, never tracked as records, so the
//!   ledger never observes its own writes.

use crate::model::change_log::{ChangeLogEntry, ChangeOperation};
use crate::model::entity::{EntityId, EntityKind, ScopeCapability, TenantId};
use crate::persistence::registry::change_type_for;
use crate::persistence::unit_of_work::{EntryState, TrackedChange};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Failure raised inside the interceptor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptorError {
    /// An added record reached the pipeline without an identity.
    MissingIdentity { kind: EntityKind },
    /// A tenant-required record carries no tenant.
    MissingTenant { kind: EntityKind, id: EntityId },
    /// A custom interceptor refused the commit.
    Rejected {
        interceptor: &'static str,
        reason: String,
    },
}

impl Display for InterceptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentity { kind } => {
                write!(f, "added {} has no identity", kind.as_str())
            }
            Self::MissingTenant { kind, id } => {
                write!(f, "tenant-required {} {id} has no tenant", kind.as_str())
            }
            Self::Rejected {
                interceptor,
                reason,
            } => write!(f, "interceptor `{interceptor}` rejected commit: {reason}"),
        }
    }
}

impl Error for InterceptorError {}

/// Mutable view of one commit handed to each interceptor in turn.
#[derive(Debug)]
pub struct CommitContext<'a> {
    pub now: i64,
    pub caller_tenant: Option<TenantId>,
    pub changes: &'a mut Vec<TrackedChange>,
    pub ledger: Vec<ChangeLogEntry>,
}

/// One ordered pre-commit hook.
pub trait SaveInterceptor: Send + Sync {
    fn name(&self) -> &'static str;
    fn before_commit(&self, ctx: &mut CommitContext<'_>) -> Result<(), InterceptorError>;
}

/// Sets `created_at`/`updated_at` from the commit's `now`.
#[derive(Debug, Default)]
pub struct AuditStampInterceptor;

impl SaveInterceptor for AuditStampInterceptor {
    fn name(&self) -> &'static str {
        "audit_stamp"
    }

    fn before_commit(&self, ctx: &mut CommitContext<'_>) -> Result<(), InterceptorError> {
        let now = ctx.now;
        for change in ctx.changes.iter_mut() {
            match change.state {
                EntryState::Added => {
                    if !change.record.audit_fields().has_identity() {
                        return Err(InterceptorError::MissingIdentity {
                            kind: change.kind(),
                        });
                    }
                    let audit = change.record.audit_fields_mut();
                    audit.created_at = now;
                    audit.updated_at = now;
                }
                EntryState::Modified => {
                    change.record.audit_fields_mut().updated_at = now;
                }
                EntryState::Removed | EntryState::Unchanged => {}
            }
        }
        Ok(())
    }
}

/// How the ledger resolves `space_id` for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpaceResolution {
    /// The record is a space.
    OwnId,
    /// The record holds a direct space reference.
    Reference,
}

const SPACE_RESOLUTION: &[(EntityKind, SpaceResolution)] = &[
    (EntityKind::Space, SpaceResolution::OwnId),
    (EntityKind::Calendar, SpaceResolution::Reference),
    (EntityKind::Task, SpaceResolution::Reference),
    (EntityKind::ShoppingList, SpaceResolution::Reference),
];

/// Appends change-log entries for every loggable tracked change.
#[derive(Debug, Default)]
pub struct ChangeLogInterceptor;

impl SaveInterceptor for ChangeLogInterceptor {
    fn name(&self) -> &'static str {
        "change_log"
    }

    fn before_commit(&self, ctx: &mut CommitContext<'_>) -> Result<(), InterceptorError> {
        let mut entries = Vec::new();
        for change in ctx.changes.iter() {
            let Some(change_type) = change_type_for(change.kind()) else {
                continue;
            };
            let Some(operation) = classify(change) else {
                continue;
            };

            entries.push(ChangeLogEntry {
                id: Uuid::new_v4(),
                change_type,
                entity_id: change.entity_id(),
                operation,
                tenant_id: resolve_tenant(change, ctx.caller_tenant)?,
                space_id: resolve_space(change),
                timestamp: ctx.now,
            });
        }
        ctx.ledger.extend(entries);
        Ok(())
    }
}

/// Maps a tracked storage state to a ledger operation.
///
/// A modification that tombstones the record is a deletion in the ledger.
pub fn classify(change: &TrackedChange) -> Option<ChangeOperation> {
    match change.state {
        EntryState::Added => Some(ChangeOperation::Created),
        EntryState::Modified if change.is_soft_delete() => Some(ChangeOperation::Deleted),
        EntryState::Modified => Some(ChangeOperation::Updated),
        EntryState::Removed => Some(ChangeOperation::Deleted),
        EntryState::Unchanged => None,
    }
}

fn resolve_tenant(
    change: &TrackedChange,
    caller_tenant: Option<TenantId>,
) -> Result<Option<TenantId>, InterceptorError> {
    match change.record.scope() {
        ScopeCapability::TenantRequired => match change.record.owner_tenant() {
            Some(tenant_id) => Ok(Some(tenant_id)),
            None => Err(InterceptorError::MissingTenant {
                kind: change.kind(),
                id: change.entity_id(),
            }),
        },
        ScopeCapability::TenantOptional => Ok(change.record.owner_tenant()),
        ScopeCapability::Unscoped if change.kind() == EntityKind::Tenant => {
            Ok(Some(change.entity_id()))
        }
        ScopeCapability::Unscoped => Ok(caller_tenant),
    }
}

fn resolve_space(change: &TrackedChange) -> Option<EntityId> {
    let (_, resolution) = SPACE_RESOLUTION
        .iter()
        .find(|(kind, _)| *kind == change.kind())?;
    match resolution {
        SpaceResolution::OwnId => Some(change.entity_id()),
        SpaceResolution::Reference => change.record.space_reference(),
    }
}

/// Ordered interceptor list run before every commit.
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn SaveInterceptor>>,
}

impl InterceptorChain {
    /// Audit stamping followed by change-log emission.
    pub fn standard() -> Self {
        Self {
            interceptors: vec![
                Box::new(AuditStampInterceptor),
                Box::new(ChangeLogInterceptor),
            ],
        }
    }

    /// Appends an interceptor after the standard passes.
    pub fn then(mut self, interceptor: Box<dyn SaveInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|interceptor| interceptor.name()).collect()
    }

    /// Runs every interceptor in order, stopping at the first error.
    pub fn run(&self, ctx: &mut CommitContext<'_>) -> Result<(), InterceptorError> {
        for interceptor in &self.interceptors {
            if let Err(err) = interceptor.before_commit(ctx) {
                warn!(
                    "event=interceptor_run module=persistence status=error interceptor={} error={}",
                    interceptor.name(),
                    err
                );
                return Err(err);
            }
            debug!(
                "event=interceptor_run module=persistence status=ok interceptor={} changes={} ledger_rows={}",
                interceptor.name(),
                ctx.changes.len(),
                ctx.ledger.len()
            );
        }
        Ok(())
    }
}

impl Default for InterceptorChain {
    fn default() -> Self {
        Self::standard()
    }
}
