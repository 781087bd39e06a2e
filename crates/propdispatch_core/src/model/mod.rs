//! Dispatch domain model.
//!
//! # Responsibility
//! - Define receiver type identities and tester registrations.
//! - Define the values exchanged between callers and property testers.
//!
//! # Invariants
//! - Resolution depends only on `ReceiverType`, never on receiver instances.

pub mod registration;
pub mod type_name;
pub mod value;
