use super::capability::{LoadedTester, TesterCapability};
use crate::activation::{MaterializationError, ModuleActivator};
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::model::registration::TesterRegistration;
use crate::model::type_name::Receiver;
use crate::model::value::PropertyValue;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Lazy stand-in for a registered tester that has not been constructed yet.
///
/// `handles` answers from the registration alone; the owning module is only
/// consulted by `is_owner_active` and `materialize`.
pub struct TesterDescriptor {
    registration: Arc<TesterRegistration>,
    activator: Arc<dyn ModuleActivator>,
}

impl TesterDescriptor {
    pub fn new(registration: TesterRegistration, activator: Arc<dyn ModuleActivator>) -> Self {
        Self {
            registration: Arc::new(registration),
            activator,
        }
    }

    pub fn id(&self) -> &str {
        &self.registration.id
    }

    pub fn owner(&self) -> &str {
        &self.registration.owner
    }
}

impl Debug for TesterDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TesterDescriptor")
            .field("id", &self.registration.id)
            .field("owner", &self.registration.owner)
            .field("type", &self.registration.type_name)
            .field("namespace", &self.registration.namespace)
            .field("properties", &self.registration.properties)
            .finish()
    }
}

impl TesterCapability for TesterDescriptor {
    fn handles(&self, namespace: &str, property: &str) -> bool {
        self.registration.handles(namespace, property)
    }

    fn is_loaded(&self) -> bool {
        false
    }

    fn is_owner_active(&self) -> bool {
        self.activator.is_owner_active(&self.registration)
    }

    fn materialize(&self) -> Result<Arc<dyn TesterCapability>, MaterializationError> {
        debug!(
            "event=tester_materialize module=tester status=start id={} owner={}",
            self.registration.id, self.registration.owner
        );
        let tester = self.activator.materialize(&self.registration)?;
        debug!(
            "event=tester_materialize module=tester status=ok id={}",
            self.registration.id
        );
        Ok(Arc::new(LoadedTester::new(
            Arc::clone(&self.registration),
            tester,
        )))
    }

    fn test(
        &self,
        _receiver: &dyn Receiver,
        property: &str,
        _args: &[PropertyValue],
        _expected: Option<&PropertyValue>,
    ) -> DispatchResult<bool> {
        Err(DispatchError::InvocationOnUnloadedTester {
            tester_id: self.registration.id.clone(),
            property: property.to_string(),
        })
    }

    fn registration(&self) -> Option<&TesterRegistration> {
        Some(&self.registration)
    }
}
