//! Organizer domain records.
//!
//! # Responsibility
//! - Define the base record shape shared by every persisted kind.
//! - Fix each kind's tenant scope capability at compile time.
//!
//! # Invariants
//! - Every record is identified by a stable `EntityId`.
//! - Deletion is a soft-delete tombstone (`deleted_at`), never a hard delete.

pub mod change_log;
pub mod entity;
pub mod planner;
pub mod reference;
pub mod tenancy;
