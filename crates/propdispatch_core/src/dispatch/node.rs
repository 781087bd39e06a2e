//! Per-type extension nodes and the upward chain walk.
//!
//! # Responsibility
//! - Hold the tester slots declared for one exact type, loaded on first use.
//! - Resolve `(namespace, property)` locally, then through supertypes.
//!
//! # Invariants
//! - At most one node exists per `TypeName` in a `NodeGraph`.
//! - A slot materializes at most once; a failed slot is never retried.
//! - Static dispatch never walks supertypes.
//! - A registry failure anywhere on the walk ends it; no outcome is produced.

use crate::activation::ModuleActivator;
use crate::hierarchy::TypeHierarchy;
use crate::model::type_name::TypeName;
use crate::registry::{RegistryError, RegistryResult, TesterRegistry};
use crate::tester::{NullTester, TesterCapability, TesterDescriptor};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of resolving a property at one node.
#[derive(Debug, Clone)]
pub enum ResolutionOutcome {
    /// A capability handles the property; it may still be provisional.
    Found(Arc<dyn TesterCapability>),
    /// Nothing here; the caller may keep searching.
    Continue,
    /// Search must stop without a match.
    Unresolvable,
}

/// State of one declared tester at a node.
#[derive(Debug)]
pub enum TesterSlot {
    Unloaded(Arc<TesterDescriptor>),
    Loaded(Arc<dyn TesterCapability>),
    Failed,
}

impl TesterSlot {
    /// Capability answering for this slot; failed slots answer as `NullTester`.
    pub fn capability(&self) -> Arc<dyn TesterCapability> {
        match self {
            Self::Unloaded(descriptor) => Arc::clone(descriptor) as Arc<dyn TesterCapability>,
            Self::Loaded(capability) => Arc::clone(capability),
            Self::Failed => Arc::new(NullTester),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Registry failure met while loading the slots of one node.
#[derive(Debug)]
pub struct NodeLoadError {
    pub type_name: TypeName,
    pub source: RegistryError,
}

/// Arena index of a node inside its `NodeGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Collaborators consulted while resolving.
pub struct ResolveContext<'a> {
    pub registry: &'a dyn TesterRegistry,
    pub hierarchy: &'a dyn TypeHierarchy,
    pub activator: &'a Arc<dyn ModuleActivator>,
}

/// Property request threaded through the chain walk.
pub struct ResolveRequest<'a> {
    pub namespace: &'a str,
    pub property: &'a str,
    pub is_static: bool,
    pub force_activation: bool,
}

/// Testers declared for one exact receiver type.
#[derive(Debug)]
pub struct TypeExtensionNode {
    type_name: TypeName,
    slots: Option<Vec<TesterSlot>>,
    parents: Option<Vec<NodeId>>,
}

impl TypeExtensionNode {
    fn new(type_name: TypeName) -> Self {
        Self {
            type_name,
            slots: None,
            parents: None,
        }
    }

    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Slots in declaration order, or `None` before the first resolution.
    pub fn slots(&self) -> Option<&[TesterSlot]> {
        self.slots.as_deref()
    }

    fn ensure_slots(&mut self, ctx: &ResolveContext<'_>) -> RegistryResult<()> {
        if self.slots.is_some() {
            return Ok(());
        }
        let entries = match ctx.registry.enumerate_testers(&self.type_name) {
            Ok(entries) => entries,
            Err(err) => {
                // Left unloaded so the next resolution asks the registry again.
                warn!(
                    "event=node_load module=dispatch status=error type={} error={}",
                    self.type_name, err
                );
                return Err(err);
            }
        };

        let slots = entries
            .into_iter()
            .map(|entry| match entry {
                Ok(registration) => TesterSlot::Unloaded(Arc::new(TesterDescriptor::new(
                    registration,
                    Arc::clone(ctx.activator),
                ))),
                Err(err) => {
                    warn!(
                        "event=node_load module=dispatch status=skipped type={} error={}",
                        self.type_name, err
                    );
                    TesterSlot::Failed
                }
            })
            .collect::<Vec<_>>();
        debug!(
            "event=node_load module=dispatch status=ok type={} slots={}",
            self.type_name,
            slots.len()
        );
        self.slots = Some(slots);
        Ok(())
    }

    /// Scans local slots in declaration order.
    ///
    /// Returns `None` when no local slot handles the property.
    fn resolve_local(
        &mut self,
        request: &ResolveRequest<'_>,
        failed_testers: &mut Vec<String>,
    ) -> Option<Arc<dyn TesterCapability>> {
        let type_name = &self.type_name;
        let slots = self.slots.as_mut()?;
        for slot in slots.iter_mut() {
            // Failed slots answer as NullTester and never match.
            let capability = slot.capability();
            if !capability.handles(request.namespace, request.property) {
                continue;
            }
            if capability.is_loaded() {
                return Some(capability);
            }
            if !(capability.is_owner_active() || request.force_activation) {
                return Some(capability);
            }

            match capability.materialize() {
                Ok(loaded) => {
                    *slot = TesterSlot::Loaded(Arc::clone(&loaded));
                    return Some(loaded);
                }
                Err(err) => {
                    let id = capability
                        .registration()
                        .map(|registration| registration.id.clone())
                        .unwrap_or_default();
                    warn!(
                        "event=tester_materialize module=dispatch status=error type={} id={} error={}",
                        type_name, id, err
                    );
                    failed_testers.push(id);
                    *slot = TesterSlot::Failed;
                }
            }
        }
        None
    }
}

/// Arena of nodes with a memoized type-to-node table.
#[derive(Debug, Default)]
pub struct NodeGraph {
    nodes: Vec<TypeExtensionNode>,
    index: HashMap<TypeName, NodeId>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds or creates the node for `type_name`.
    pub fn node_for(&mut self, type_name: &TypeName) -> NodeId {
        if let Some(id) = self.index.get(type_name) {
            return *id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(TypeExtensionNode::new(type_name.clone()));
        self.index.insert(type_name.clone(), id);
        id
    }

    pub fn node(&self, id: NodeId) -> &TypeExtensionNode {
        &self.nodes[id.0]
    }

    pub fn find(&self, type_name: &TypeName) -> Option<&TypeExtensionNode> {
        self.index.get(type_name).map(|id| self.node(*id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
    }

    /// Resolves at `id`, walking supertypes in declaration order.
    ///
    /// The first supertype that does not answer `Continue` decides the
    /// outcome for the whole walk.
    ///
    /// # Errors
    /// - `NodeLoadError` when the registry cannot enumerate a type on the
    ///   walk. Supertypes of that type are not consulted.
    pub fn resolve(
        &mut self,
        id: NodeId,
        ctx: &ResolveContext<'_>,
        request: &ResolveRequest<'_>,
        failed_testers: &mut Vec<String>,
    ) -> Result<ResolutionOutcome, NodeLoadError> {
        let node = &mut self.nodes[id.0];
        if let Err(source) = node.ensure_slots(ctx) {
            return Err(NodeLoadError {
                type_name: node.type_name.clone(),
                source,
            });
        }
        if let Some(capability) = node.resolve_local(request, failed_testers) {
            return Ok(ResolutionOutcome::Found(capability));
        }
        if request.is_static {
            return Ok(ResolutionOutcome::Unresolvable);
        }

        for parent in self.parents_of(id, ctx) {
            match self.resolve(parent, ctx, request, failed_testers)? {
                ResolutionOutcome::Continue => continue,
                outcome => return Ok(outcome),
            }
        }
        Ok(ResolutionOutcome::Continue)
    }

    fn parents_of(&mut self, id: NodeId, ctx: &ResolveContext<'_>) -> Vec<NodeId> {
        if let Some(parents) = &self.nodes[id.0].parents {
            return parents.clone();
        }
        let supertypes = ctx.hierarchy.supertypes(&self.nodes[id.0].type_name);
        let parents: Vec<NodeId> = supertypes
            .iter()
            .map(|supertype| self.node_for(supertype))
            .collect();
        self.nodes[id.0].parents = Some(parents.clone());
        parents
    }
}

#[cfg(test)]
mod tests {
    use super::{NodeGraph, NodeId, ResolutionOutcome, ResolveContext, ResolveRequest, TesterSlot};
    use crate::activation::{ModuleActivator, ModuleState, ModuleTable};
    use crate::hierarchy::StaticTypeHierarchy;
    use crate::model::registration::TesterRegistration;
    use crate::model::type_name::{Receiver, TypeName};
    use crate::model::value::PropertyValue;
    use crate::db::DbError;
    use crate::registry::{
        InMemoryTesterRegistry, RegistryEntry, RegistryError, RegistryResult, TesterRegistry,
    };
    use crate::tester::PropertyTester;
    use std::sync::Arc;

    struct Constant(bool);

    impl PropertyTester for Constant {
        fn test(
            &self,
            _receiver: &dyn Receiver,
            _property: &str,
            _args: &[PropertyValue],
            _expected: Option<&PropertyValue>,
        ) -> bool {
            self.0
        }
    }

    fn name(value: &str) -> TypeName {
        TypeName::new(value).expect("valid type name")
    }

    fn registration(id: &str, owner: &str, type_name: &str, class: &str) -> TesterRegistration {
        TesterRegistration::from_declaration(id, owner, name(type_name), "ns", "p", class)
    }

    struct Fixture {
        registry: InMemoryTesterRegistry,
        hierarchy: StaticTypeHierarchy,
        activator: Arc<dyn ModuleActivator>,
        table: Arc<ModuleTable>,
    }

    impl Fixture {
        fn new() -> Self {
            let table = Arc::new(ModuleTable::new());
            table
                .declare_module("mod.active", ModuleState::Active)
                .expect("declare active module");
            table
                .declare_module("mod.lazy", ModuleState::Resolved)
                .expect("declare lazy module");
            table
                .declare_module("mod.broken", ModuleState::Disabled)
                .expect("declare broken module");
            table
                .register_factory("True", || Ok(Arc::new(Constant(true)) as Arc<dyn PropertyTester>))
                .expect("register factory");

            let mut hierarchy = StaticTypeHierarchy::new();
            hierarchy.declare(name("Parent"), vec![]).expect("declare Parent");
            hierarchy
                .declare(name("Child"), vec![name("Parent")])
                .expect("declare Child");

            Self {
                registry: InMemoryTesterRegistry::new(),
                hierarchy,
                activator: table.clone(),
                table,
            }
        }

        fn ctx(&self) -> ResolveContext<'_> {
            ResolveContext {
                registry: &self.registry,
                hierarchy: &self.hierarchy,
                activator: &self.activator,
            }
        }
    }

    fn request(is_static: bool, force_activation: bool) -> ResolveRequest<'static> {
        ResolveRequest {
            namespace: "ns",
            property: "p",
            is_static,
            force_activation,
        }
    }

    fn resolve(
        graph: &mut NodeGraph,
        fixture: &Fixture,
        node: NodeId,
        request: ResolveRequest<'_>,
        failed: &mut Vec<String>,
    ) -> ResolutionOutcome {
        graph
            .resolve(node, &fixture.ctx(), &request, failed)
            .expect("registry available")
    }

    fn found_id(outcome: &ResolutionOutcome) -> Option<String> {
        match outcome {
            ResolutionOutcome::Found(capability) => capability
                .registration()
                .map(|registration| registration.id.clone()),
            _ => None,
        }
    }

    #[test]
    fn walks_to_parent_when_child_declares_nothing() {
        let fixture = Fixture::new();
        fixture
            .registry
            .register(registration("parent.tester", "mod.active", "Parent", "True"))
            .expect("register");

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        let mut failed = Vec::new();
        let outcome = resolve(&mut graph, &fixture, child, request(false, false), &mut failed);
        assert_eq!(found_id(&outcome).as_deref(), Some("parent.tester"));
        // The walk stops at Parent; the root node is never created.
        assert_eq!(graph.len(), 2);
        assert!(failed.is_empty());
    }

    #[test]
    fn static_dispatch_skips_supertypes() {
        let fixture = Fixture::new();
        fixture
            .registry
            .register(registration("parent.tester", "mod.active", "Parent", "True"))
            .expect("register");

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        let outcome = resolve(&mut graph, &fixture, child, request(true, false), &mut Vec::new());
        assert!(matches!(outcome, ResolutionOutcome::Unresolvable));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn root_without_match_continues() {
        let fixture = Fixture::new();
        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        let outcome = resolve(&mut graph, &fixture, child, request(false, true), &mut Vec::new());
        assert!(matches!(outcome, ResolutionOutcome::Continue));
    }

    #[test]
    fn inactive_owner_yields_provisional_match_without_materializing() {
        let fixture = Fixture::new();
        fixture
            .registry
            .register(registration("lazy.tester", "mod.lazy", "Child", "True"))
            .expect("register");

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        let outcome = resolve(
            &mut graph,
            &fixture,
            child,
            request(false, false),
            &mut Vec::new(),
        );
        match outcome {
            ResolutionOutcome::Found(capability) => assert!(!capability.is_loaded()),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(fixture.table.factory_invocations("True"), 0);
        assert!(matches!(
            graph.node(child).slots().expect("slots loaded")[0],
            TesterSlot::Unloaded(_)
        ));
    }

    #[test]
    fn forced_activation_materializes_once_and_replaces_slot() {
        let fixture = Fixture::new();
        fixture
            .registry
            .register(registration("lazy.tester", "mod.lazy", "Child", "True"))
            .expect("register");

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        for _ in 0..3 {
            let outcome = resolve(
                &mut graph,
                &fixture,
                child,
                request(false, true),
                &mut Vec::new(),
            );
            match outcome {
                ResolutionOutcome::Found(capability) => assert!(capability.is_loaded()),
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(fixture.table.factory_invocations("True"), 1);
        assert!(matches!(
            graph.node(child).slots().expect("slots loaded")[0],
            TesterSlot::Loaded(_)
        ));
    }

    #[test]
    fn failed_materialization_falls_through_to_next_candidate() {
        let fixture = Fixture::new();
        fixture
            .registry
            .register(registration("broken.tester", "mod.broken", "Child", "True"))
            .expect("register broken");
        fixture
            .registry
            .register(registration("parent.tester", "mod.active", "Parent", "True"))
            .expect("register parent");

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        let mut failed = Vec::new();
        let outcome = resolve(&mut graph, &fixture, child, request(false, true), &mut failed);
        assert_eq!(found_id(&outcome).as_deref(), Some("parent.tester"));
        assert_eq!(failed, vec!["broken.tester".to_string()]);
        assert!(graph.node(child).slots().expect("slots loaded")[0].is_failed());

        let mut failed_again = Vec::new();
        resolve(&mut graph, &fixture, child, request(false, true), &mut failed_again);
        assert!(failed_again.is_empty());
    }

    /// Registry whose enumeration fails for one type.
    struct FailingFor {
        type_name: TypeName,
        inner: InMemoryTesterRegistry,
    }

    impl TesterRegistry for FailingFor {
        fn enumerate_testers(&self, type_name: &TypeName) -> RegistryResult<Vec<RegistryEntry>> {
            if type_name == &self.type_name {
                return Err(RegistryError::Db(DbError::Sqlite(
                    rusqlite::Error::InvalidQuery,
                )));
            }
            self.inner.enumerate_testers(type_name)
        }
    }

    #[test]
    fn registry_failure_on_ancestor_ends_the_walk() {
        let fixture = Fixture::new();
        let registry = FailingFor {
            type_name: name("Parent"),
            inner: InMemoryTesterRegistry::new(),
        };
        let ctx = ResolveContext {
            registry: &registry,
            hierarchy: &fixture.hierarchy,
            activator: &fixture.activator,
        };

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        let err = graph
            .resolve(child, &ctx, &request(false, false), &mut Vec::new())
            .expect_err("Parent cannot be enumerated");
        assert_eq!(err.type_name, name("Parent"));
        assert!(graph.node(child).slots().is_some());
        assert!(graph
            .find(&name("Parent"))
            .expect("parent node exists")
            .slots()
            .is_none());
    }

    #[test]
    fn failed_enumeration_is_retried_on_next_resolution() {
        let fixture = Fixture::new();
        let registry = FailingFor {
            type_name: name("Child"),
            inner: InMemoryTesterRegistry::new(),
        };
        registry
            .inner
            .register(registration("child.tester", "mod.active", "Child", "True"))
            .expect("register");
        let failing = ResolveContext {
            registry: &registry,
            hierarchy: &fixture.hierarchy,
            activator: &fixture.activator,
        };

        let mut graph = NodeGraph::new();
        let child = graph.node_for(&name("Child"));
        assert!(graph
            .resolve(child, &failing, &request(false, false), &mut Vec::new())
            .is_err());
        assert!(graph.node(child).slots().is_none());
        assert_eq!(graph.len(), 1);

        let healthy = ResolveContext {
            registry: &registry.inner,
            hierarchy: &fixture.hierarchy,
            activator: &fixture.activator,
        };
        let outcome = graph
            .resolve(child, &healthy, &request(false, false), &mut Vec::new())
            .expect("registry recovered");
        assert_eq!(found_id(&outcome).as_deref(), Some("child.tester"));
    }

    #[test]
    fn node_table_is_memoized() {
        let mut graph = NodeGraph::new();
        let first = graph.node_for(&name("Child"));
        let second = graph.node_for(&name("Child"));
        assert_eq!(first, second);
        assert_eq!(graph.len(), 1);
        assert!(graph.find(&name("Child")).is_some());
        graph.clear();
        assert!(graph.is_empty());
    }
}
