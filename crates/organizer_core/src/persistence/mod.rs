//! Persistence integrity pipeline.
//!
//! # Responsibility
//! - Scope every read to the caller's tenant and hide soft-deleted rows.
//! - Stamp audit fields and append the change ledger atomically with every
//!   commit.
//!
//! # Invariants
//! - Registries in this module are `const` tables and never change at runtime.
//! - A commit writes data rows and ledger rows in one transaction.

pub mod data_context;
pub mod interceptor;
pub mod record;
pub mod registry;
pub mod scope;
pub mod unit_of_work;
