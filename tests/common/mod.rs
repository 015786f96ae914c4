//! Shared test utilities for bind-query-exporter integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Nothing here touches the network: reverse lookups go
//! through [`StaticResolver`] and lines are fed through in-memory channels.

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
