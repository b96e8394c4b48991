//! Change-type registry: closed mapping between entity kinds and the ledger
//! discriminator.
//!
//! # Invariants
//! - The mapping is bijective over its entries.
//! - `EntityKind::ChangeLog` has no entry, so ledger writes are never logged.

use crate::model::entity::EntityKind;
use serde::{Deserialize, Serialize};

/// Persisted ledger discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Tenant,
    User,
    Space,
    Calendar,
    Task,
    Contact,
    ShoppingList,
    Category,
    Holiday,
}

impl ChangeType {
    /// Stable string stored in `change_log.entity_kind`.
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
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        CHANGE_TYPE_REGISTRY
            .iter()
            .map(|(_, change_type)| *change_type)
            .find(|change_type| change_type.as_str() == value)
    }
}

const CHANGE_TYPE_REGISTRY: &[(EntityKind, ChangeType)] = &[
    (EntityKind::Tenant, ChangeType::Tenant),
    (EntityKind::User, ChangeType::User),
    (EntityKind::Space, ChangeType::Space),
    (EntityKind::Calendar, ChangeType::Calendar),
    (EntityKind::Task, ChangeType::Task),
    (EntityKind::Contact, ChangeType::Contact),
    (EntityKind::ShoppingList, ChangeType::ShoppingList),
    (EntityKind::Category, ChangeType::Category),
    (EntityKind::Holiday, ChangeType::Holiday),
];

/// Returns the ledger discriminator for a kind, or `None` when the kind is
/// not logged.
pub fn change_type_for(kind: EntityKind) -> Option<ChangeType> {
    CHANGE_TYPE_REGISTRY
        .iter()
        .find(|(entry_kind, _)| *entry_kind == kind)
        .map(|(_, change_type)| *change_type)
}

/// Returns the entity kind a ledger discriminator refers to.
pub fn entity_kind_for(change_type: ChangeType) -> EntityKind {
    match change_type {
        ChangeType::Tenant => EntityKind::Tenant,
        ChangeType::User => EntityKind::User,
        ChangeType::Space => EntityKind::Space,
        ChangeType::Calendar => EntityKind::Calendar,
        ChangeType::Task => EntityKind::Task,
        ChangeType::Contact => EntityKind::Contact,
        ChangeType::ShoppingList => EntityKind::ShoppingList,
        ChangeType::Category => EntityKind::Category,
        ChangeType::Holiday => EntityKind::Holiday,
    }
}

/// Returns all registered `(kind, change type)` pairs.
pub fn registered_change_types() -> &'static [(EntityKind, ChangeType)] {
    CHANGE_TYPE_REGISTRY
}
