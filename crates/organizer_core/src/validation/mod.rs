//! Pre-write validation of loosely-typed mutation inputs.
//!
//! # Responsibility
//! - Rebuild typed commands from mutation argument bags.
//! - Block writes whose commands violate registered rules.
//!
//! # See also
//! - `organizer` for the default organizer command set.

pub mod args;
pub mod command;
pub mod dispatcher;
pub mod organizer;
pub mod validator;
