//! Dispatch engine facade.
//!
//! # Responsibility
//! - Resolve `(receiver type, namespace, property)` to a bound tester.
//! - Own the binding cache and the type-to-node table.
//! - Drop all derived state when tester registrations change.
//!
//! # Invariants
//! - Cache lookup, resolution, and cache insertion run under one lock.
//! - Resolution and registry errors are never cached.
//! - A provisional cached binding is re-resolved for forcing callers.

use crate::activation::ModuleActivator;
use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::binding::{EvaluationResult, PropertyBinding, PropertyKey};
use crate::dispatch::cache::{CacheStats, ResultCache};
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::dispatch::node::{NodeGraph, ResolutionOutcome, ResolveContext, ResolveRequest};
use crate::hierarchy::TypeHierarchy;
use crate::model::type_name::{Receiver, ReceiverType, TypeName};
use crate::model::value::PropertyValue;
use crate::registry::{RegistryChangeEvent, TesterRegistry};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

struct EngineState {
    cache: ResultCache,
    graph: NodeGraph,
}

/// Resolves and caches property testers for receiver types.
pub struct DispatchEngine {
    registry: Arc<dyn TesterRegistry>,
    hierarchy: Arc<dyn TypeHierarchy>,
    activator: Arc<dyn ModuleActivator>,
    state: Mutex<EngineState>,
}

impl DispatchEngine {
    /// Builds an engine over its three collaborators.
    ///
    /// # Errors
    /// - `ConfigError::ZeroCacheCapacity` when the cache capacity is zero.
    pub fn new(
        config: &EngineConfig,
        registry: Arc<dyn TesterRegistry>,
        hierarchy: Arc<dyn TypeHierarchy>,
        activator: Arc<dyn ModuleActivator>,
    ) -> Result<Self, ConfigError> {
        let capacity = config.cache_capacity_non_zero()?;
        info!(
            "event=engine_init module=dispatch status=ok cache_capacity={}",
            capacity
        );
        Ok(Self {
            registry,
            hierarchy,
            activator,
            state: Mutex::new(EngineState {
                cache: ResultCache::new(capacity),
                graph: NodeGraph::new(),
            }),
        })
    }

    /// Returns the binding for `receiver_type`, resolving on cache miss.
    ///
    /// Type-value receivers resolve by static dispatch: only testers
    /// declared for that exact type are considered.
    ///
    /// # Errors
    /// - `DispatchError::Resolution` when no tester in the chain handles the
    ///   property.
    /// - `DispatchError::Registry` when the registry cannot enumerate a type
    ///   on the walk. Nothing is cached and the next call asks again.
    pub fn get_binding(
        &self,
        receiver_type: &ReceiverType,
        namespace: &str,
        property: &str,
        force_activation: bool,
    ) -> DispatchResult<PropertyBinding> {
        let key = PropertyKey::new(receiver_type.clone(), namespace, property);
        let mut state = self.state.lock();

        if let Some(cached) = state.cache.get(&key) {
            if cached.is_reusable_for(force_activation) {
                debug!("event=binding_lookup module=dispatch status=hit key={key}");
                return Ok(cached);
            }
            debug!("event=binding_lookup module=dispatch status=stale key={key}");
            state.cache.invalidate_stale(&key);
        } else {
            debug!("event=binding_lookup module=dispatch status=miss key={key}");
        }

        let EngineState { cache, graph } = &mut *state;
        let ctx = ResolveContext {
            registry: self.registry.as_ref(),
            hierarchy: self.hierarchy.as_ref(),
            activator: &self.activator,
        };
        let request = ResolveRequest {
            namespace,
            property,
            is_static: receiver_type.is_static(),
            force_activation,
        };
        let node = graph.node_for(&receiver_type.type_name);
        let mut failed_testers = Vec::new();

        let outcome = match graph.resolve(node, &ctx, &request, &mut failed_testers) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    "event=binding_resolve module=dispatch status=registry_error key={} type={} error={}",
                    key, err.type_name, err.source
                );
                return Err(DispatchError::Registry {
                    receiver_type: key.receiver_type,
                    type_name: err.type_name,
                    message: err.source.to_string(),
                });
            }
        };

        match outcome {
            ResolutionOutcome::Found(tester) => {
                let binding = PropertyBinding::new(key.clone(), tester, force_activation);
                debug!(
                    "event=binding_resolve module=dispatch status=ok key={} tester={} loaded={}",
                    key,
                    binding.tester_id().unwrap_or("unknown"),
                    binding.is_loaded()
                );
                if let Some(evicted) = cache.put(key, binding.clone()) {
                    debug!("event=binding_evict module=dispatch status=ok key={evicted}");
                }
                Ok(binding)
            }
            ResolutionOutcome::Continue | ResolutionOutcome::Unresolvable => {
                debug!("event=binding_resolve module=dispatch status=unresolved key={key}");
                Err(DispatchError::Resolution {
                    receiver_type: key.receiver_type,
                    namespace: key.namespace,
                    property: key.property,
                    failed_testers,
                })
            }
        }
    }

    /// Static-dispatch lookup for a type value.
    pub fn get_static_binding(
        &self,
        type_name: &TypeName,
        namespace: &str,
        property: &str,
        force_activation: bool,
    ) -> DispatchResult<PropertyBinding> {
        self.get_binding(
            &ReceiverType::type_value(type_name.clone()),
            namespace,
            property,
            force_activation,
        )
    }

    /// Resolves for `receiver` and evaluates the property on it.
    ///
    /// Provisional bindings evaluate to `EvaluationResult::NotLoaded`.
    pub fn test(
        &self,
        receiver: &dyn Receiver,
        namespace: &str,
        property: &str,
        args: &[PropertyValue],
        expected: Option<&PropertyValue>,
        force_activation: bool,
    ) -> DispatchResult<EvaluationResult> {
        let binding = self.get_binding(
            &receiver.receiver_type(),
            namespace,
            property,
            force_activation,
        )?;
        if !binding.is_loaded() {
            return Ok(EvaluationResult::NotLoaded);
        }
        binding
            .invoke(receiver, args, expected)
            .map(EvaluationResult::from)
    }

    /// Drops every cached binding and the whole node table.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        let dropped_bindings = state.cache.len();
        let dropped_nodes = state.graph.len();
        state.cache.clear();
        state.graph.clear();
        info!(
            "event=engine_invalidate module=dispatch status=ok bindings={} nodes={}",
            dropped_bindings, dropped_nodes
        );
    }

    /// Reacts to a registry change notification.
    pub fn on_registry_changed(&self, event: &RegistryChangeEvent) {
        info!(
            "event=registry_changed module=dispatch kind={:?} id={} type={}",
            event.kind, event.registration_id, event.type_name
        );
        self.invalidate_all();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.lock().cache.stats()
    }

    pub fn cached_len(&self) -> usize {
        self.state.lock().cache.len()
    }

    /// Number of type nodes created since the last invalidation.
    pub fn node_count(&self) -> usize {
        self.state.lock().graph.len()
    }
}
