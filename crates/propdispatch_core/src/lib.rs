//! Declarative property-testing dispatch engine.
//!
//! Property testers are registered against a declared type and namespace;
//! the engine locates, lazily materializes, invokes, and caches the tester
//! responsible for a `(receiver type, namespace, property)` triple.

pub mod activation;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod registry;
pub mod tester;

pub use activation::{
    ActivationError, MaterializationError, ModuleActivator, ModuleState, ModuleTable,
};
pub use config::{ConfigError, EngineConfig, LoggingConfig};
pub use dispatch::binding::{EvaluationResult, PropertyBinding, PropertyKey};
pub use dispatch::cache::{CacheStats, ResultCache, DEFAULT_CACHE_CAPACITY};
pub use dispatch::engine::DispatchEngine;
pub use dispatch::error::{DispatchError, DispatchResult};
pub use hierarchy::{HierarchyError, StaticTypeHierarchy, TypeHierarchy};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::registration::{RegistrationError, TesterRegistration};
pub use model::type_name::{Receiver, ReceiverKind, ReceiverType, TypeName, TypeNameError};
pub use model::value::PropertyValue;
pub use registry::{
    InMemoryTesterRegistry, RegistryChangeEvent, RegistryChangeKind, RegistryEntry,
    RegistryError, RegistryResult, SqliteTesterRegistry, TesterRegistry,
};
pub use tester::{LoadedTester, NullTester, PropertyTester, TesterCapability, TesterDescriptor};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
