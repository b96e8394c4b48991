//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and repository calls into mutation entry points.
//! - Project internal errors into caller-safe shapes.

pub mod inputs;
pub mod mutation_service;
pub mod public_error;
