//! Property tester dispatch.
//!
//! # Responsibility
//! - Walk the receiver type chain to find the tester for a property.
//! - Cache resolved bindings in a bounded LRU cache.
//!
//! # Invariants
//! - Resolution depends only on receiver type, namespace, and property name.
//! - All shared mutable state is owned by `DispatchEngine` behind one lock.

pub mod binding;
pub mod cache;
pub mod engine;
pub mod error;
pub mod node;
