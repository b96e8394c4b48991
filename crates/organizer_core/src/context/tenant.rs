//! Tenant resolution collaborator.

use crate::model::entity::TenantId;
use std::sync::RwLock;

/// Resolves the caller's tenant for the current request.
///
/// `None` means "no tenant context" (unauthenticated or administrative).
pub trait TenantResolver: Send + Sync {
    fn current_tenant(&self) -> Option<TenantId>;
}

/// Resolver that always answers the same tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedTenantResolver {
    tenant_id: Option<TenantId>,
}

impl FixedTenantResolver {
    pub fn new(tenant_id: Option<TenantId>) -> Self {
        Self { tenant_id }
    }

    pub fn tenant(tenant_id: TenantId) -> Self {
        Self::new(Some(tenant_id))
    }

    pub fn none() -> Self {
        Self::new(None)
    }
}

impl TenantResolver for FixedTenantResolver {
    fn current_tenant(&self) -> Option<TenantId> {
        self.tenant_id
    }
}

/// Resolver whose answer can be switched between requests, e.g. by a
/// session layer or a test acting as several callers.
#[derive(Debug, Default)]
pub struct SwitchableTenantResolver {
    tenant_id: RwLock<Option<TenantId>>,
}

impl SwitchableTenantResolver {
    pub fn new(tenant_id: Option<TenantId>) -> Self {
        Self {
            tenant_id: RwLock::new(tenant_id),
        }
    }

    pub fn switch_to(&self, tenant_id: Option<TenantId>) {
        match self.tenant_id.write() {
            Ok(mut guard) => *guard = tenant_id,
            Err(poisoned) => *poisoned.into_inner() = tenant_id,
        }
    }
}

impl TenantResolver for SwitchableTenantResolver {
    fn current_tenant(&self) -> Option<TenantId> {
        match self.tenant_id.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FixedTenantResolver, SwitchableTenantResolver, TenantResolver};
    use uuid::Uuid;

    #[test]
    fn fixed_resolver_returns_configured_tenant() {
        let tenant = Uuid::new_v4();
        assert_eq!(FixedTenantResolver::tenant(tenant).current_tenant(), Some(tenant));
        assert_eq!(FixedTenantResolver::none().current_tenant(), None);
    }

    #[test]
    fn switchable_resolver_follows_switches() {
        let resolver = SwitchableTenantResolver::new(None);
        let tenant = Uuid::new_v4();
        resolver.switch_to(Some(tenant));
        assert_eq!(resolver.current_tenant(), Some(tenant));
        resolver.switch_to(None);
        assert_eq!(resolver.current_tenant(), None);
    }
}
