//! Core persistence integrity pipeline for the multi-tenant organizer.
//! Tenant scoping, audit stamping, the change ledger and mutation validation
//! all live in this crate.

pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod persistence;
pub mod repo;
pub mod service;
pub mod validation;

pub use context::clock::{Clock, ManualClock, SystemClock};
pub use context::tenant::{FixedTenantResolver, SwitchableTenantResolver, TenantResolver};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::change_log::{ChangeLogEntry, ChangeOperation};
pub use model::entity::{AuditFields, Entity, EntityId, EntityKind, ScopeCapability, TenantId};
pub use model::planner::{Calendar, Contact, ShoppingList, Task};
pub use model::reference::{Category, Holiday};
pub use model::tenancy::{Space, Tenant, User};
pub use persistence::data_context::{CommitReceipt, DataContext};
pub use persistence::interceptor::{InterceptorChain, InterceptorError, SaveInterceptor};
pub use persistence::registry::ChangeType;
pub use persistence::scope::QueryScope;
pub use persistence::unit_of_work::{EntryState, UnitOfWork};
pub use repo::entity_repo::{RepoError, RepoResult, Repository};
pub use service::mutation_service::{MutationError, MutationResult, MutationService};
pub use service::public_error::PublicError;
pub use validation::dispatcher::{DispatchOutcome, MutationDispatcher, ValidationFailure};
pub use validation::organizer::organizer_dispatcher;

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
