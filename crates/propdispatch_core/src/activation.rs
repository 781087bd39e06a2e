//! Module-activation collaborator.
//!
//! # Responsibility
//! - Report whether the module owning a tester registration is active.
//! - Construct real testers from registration construction data.
//!
//! # Invariants
//! - `materialize` activates the owning module before running its factory.
//! - A disabled module never becomes active through materialization.
//!
//! # See also
//! - `tester::TesterDescriptor`, the only caller of this contract.

use crate::model::registration::TesterRegistration;
use crate::tester::PropertyTester;
use log::{info, warn};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Owner-module lifecycle and tester construction contract.
pub trait ModuleActivator: Send + Sync {
    /// `true` when the module declaring `registration` is already active.
    fn is_owner_active(&self, registration: &TesterRegistration) -> bool;

    /// Builds the tester declared by `registration`, loading its owner if needed.
    fn materialize(
        &self,
        registration: &TesterRegistration,
    ) -> Result<Arc<dyn PropertyTester>, MaterializationError>;
}

/// Tester construction failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializationError {
    UnknownOwner(String),
    OwnerDisabled(String),
    UnknownClass { owner: String, class: String },
    ConstructionFailed { class: String, message: String },
}

impl Display for MaterializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOwner(owner) => write!(f, "owning module is not declared: {owner}"),
            Self::OwnerDisabled(owner) => write!(f, "owning module is disabled: {owner}"),
            Self::UnknownClass { owner, class } => {
                write!(f, "module {owner} provides no tester class {class}")
            }
            Self::ConstructionFailed { class, message } => {
                write!(f, "tester class {class} failed to construct: {message}")
            }
        }
    }
}

impl Error for MaterializationError {}

/// Lifecycle state of one owning module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Installed and resolvable but not started.
    Resolved,
    Active,
    /// Cannot be started; materialization always fails.
    Disabled,
}

/// Factory producing one tester instance per call.
pub type TesterFactory =
    Arc<dyn Fn() -> Result<Arc<dyn PropertyTester>, String> + Send + Sync + 'static>;

struct FactoryEntry {
    factory: TesterFactory,
    invocations: AtomicUsize,
}

/// In-process module table with per-class tester factories.
#[derive(Default)]
pub struct ModuleTable {
    modules: RwLock<BTreeMap<String, ModuleState>>,
    factories: RwLock<BTreeMap<String, Arc<FactoryEntry>>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares one module with its initial state.
    pub fn declare_module(
        &self,
        module_id: &str,
        state: ModuleState,
    ) -> Result<(), ActivationError> {
        let module_id = module_id.trim();
        if module_id.is_empty() {
            return Err(ActivationError::InvalidModuleId(module_id.to_string()));
        }
        let mut modules = self.modules.write();
        if modules.contains_key(module_id) {
            return Err(ActivationError::DuplicateModule(module_id.to_string()));
        }
        modules.insert(module_id.to_string(), state);
        Ok(())
    }

    /// Registers the factory for one tester construction class.
    pub fn register_factory<F>(&self, class: &str, factory: F) -> Result<(), ActivationError>
    where
        F: Fn() -> Result<Arc<dyn PropertyTester>, String> + Send + Sync + 'static,
    {
        let class = class.trim();
        if class.is_empty() {
            return Err(ActivationError::InvalidClass(class.to_string()));
        }
        let mut factories = self.factories.write();
        if factories.contains_key(class) {
            return Err(ActivationError::DuplicateClass(class.to_string()));
        }
        factories.insert(
            class.to_string(),
            Arc::new(FactoryEntry {
                factory: Arc::new(factory),
                invocations: AtomicUsize::new(0),
            }),
        );
        Ok(())
    }

    /// Starts a resolved module. Starting an active module is a no-op.
    pub fn activate(&self, module_id: &str) -> Result<(), ActivationError> {
        let mut modules = self.modules.write();
        match modules.get_mut(module_id.trim()) {
            None => Err(ActivationError::ModuleNotFound(module_id.trim().to_string())),
            Some(ModuleState::Disabled) => {
                Err(ActivationError::ModuleDisabled(module_id.trim().to_string()))
            }
            Some(state) => {
                if *state != ModuleState::Active {
                    *state = ModuleState::Active;
                    info!("event=module_activate module=activation status=ok id={module_id}");
                }
                Ok(())
            }
        }
    }

    /// Disables a module so later materializations fail.
    pub fn disable(&self, module_id: &str) -> Result<(), ActivationError> {
        let mut modules = self.modules.write();
        match modules.get_mut(module_id.trim()) {
            None => Err(ActivationError::ModuleNotFound(module_id.trim().to_string())),
            Some(state) => {
                *state = ModuleState::Disabled;
                Ok(())
            }
        }
    }

    pub fn module_state(&self, module_id: &str) -> Option<ModuleState> {
        self.modules.read().get(module_id.trim()).copied()
    }

    /// Number of times the factory for `class` has run.
    pub fn factory_invocations(&self, class: &str) -> usize {
        self.factories
            .read()
            .get(class.trim())
            .map_or(0, |entry| entry.invocations.load(Ordering::SeqCst))
    }

    fn ensure_active(&self, owner: &str) -> Result<(), MaterializationError> {
        let mut modules = self.modules.write();
        match modules.get_mut(owner) {
            None => Err(MaterializationError::UnknownOwner(owner.to_string())),
            Some(ModuleState::Disabled) => {
                Err(MaterializationError::OwnerDisabled(owner.to_string()))
            }
            Some(state) => {
                if *state == ModuleState::Resolved {
                    *state = ModuleState::Active;
                    info!(
                        "event=module_activate module=activation status=ok id={owner} reason=materialize"
                    );
                }
                Ok(())
            }
        }
    }
}

impl ModuleActivator for ModuleTable {
    fn is_owner_active(&self, registration: &TesterRegistration) -> bool {
        self.module_state(&registration.owner) == Some(ModuleState::Active)
    }

    fn materialize(
        &self,
        registration: &TesterRegistration,
    ) -> Result<Arc<dyn PropertyTester>, MaterializationError> {
        self.ensure_active(registration.owner.trim())?;

        // Factory runs without holding the table lock.
        let entry = self
            .factories
            .read()
            .get(registration.class.trim())
            .cloned()
            .ok_or_else(|| MaterializationError::UnknownClass {
                owner: registration.owner.clone(),
                class: registration.class.clone(),
            })?;
        entry.invocations.fetch_add(1, Ordering::SeqCst);

        (entry.factory)().map_err(|message| {
            warn!(
                "event=tester_construct module=activation status=error class={} error={}",
                registration.class, message
            );
            MaterializationError::ConstructionFailed {
                class: registration.class.clone(),
                message,
            }
        })
    }
}

/// Module table bookkeeping errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    InvalidModuleId(String),
    DuplicateModule(String),
    ModuleNotFound(String),
    ModuleDisabled(String),
    InvalidClass(String),
    DuplicateClass(String),
}

impl Display for ActivationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidModuleId(value) => write!(f, "module id is invalid: {value:?}"),
            Self::DuplicateModule(value) => write!(f, "module already declared: {value}"),
            Self::ModuleNotFound(value) => write!(f, "module not found: {value}"),
            Self::ModuleDisabled(value) => write!(f, "module is disabled: {value}"),
            Self::InvalidClass(value) => write!(f, "tester class is invalid: {value:?}"),
            Self::DuplicateClass(value) => {
                write!(f, "tester class already registered: {value}")
            }
        }
    }
}

impl Error for ActivationError {}
