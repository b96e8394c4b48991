//! Injected collaborators consulted by the commit pipeline and the query
//! scope compiler.
//!
//! # Invariants
//! - Pipeline code never reads the system clock or ambient tenant directly;
//!   both come through these traits.

pub mod clock;
pub mod tenant;
