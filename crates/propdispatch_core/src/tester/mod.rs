//! Property tester capabilities.
//!
//! # Responsibility
//! - Define the user-facing `PropertyTester` contract.
//! - Define the `TesterCapability` states the engine binds to: loaded
//!   testers, lazy descriptors, and the null tester.
//!
//! # Invariants
//! - Only loaded capabilities may be invoked.
//! - `handles` never triggers materialization.

mod capability;
mod descriptor;

pub use capability::{LoadedTester, NullTester, PropertyTester, TesterCapability};
pub use descriptor::TesterDescriptor;
