//! Repository layer over the persistence pipeline.
//!
//! # Responsibility
//! - Expose use-case oriented CRUD for every organizer entity kind.
//! - Keep SQL and scope filtering out of service code.
//!
//! # Invariants
//! - Repository writes always go through `DataContext::commit`.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod entity_repo;
