use crate::activation::MaterializationError;
use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::model::registration::TesterRegistration;
use crate::model::type_name::Receiver;
use crate::model::value::PropertyValue;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Implementation of one or more named properties for one declared type.
pub trait PropertyTester: Send + Sync {
    /// Evaluates `property` on `receiver`.
    fn test(
        &self,
        receiver: &dyn Receiver,
        property: &str,
        args: &[PropertyValue],
        expected: Option<&PropertyValue>,
    ) -> bool;
}

impl<F> PropertyTester for F
where
    F: Fn(&dyn Receiver, &str, &[PropertyValue], Option<&PropertyValue>) -> bool + Send + Sync,
{
    fn test(
        &self,
        receiver: &dyn Receiver,
        property: &str,
        args: &[PropertyValue],
        expected: Option<&PropertyValue>,
    ) -> bool {
        self(receiver, property, args, expected)
    }
}

/// Contract shared by every tester state the engine can bind to.
pub trait TesterCapability: Send + Sync + Debug {
    /// Cheap, side-effect-free check against declared metadata.
    fn handles(&self, namespace: &str, property: &str) -> bool;

    /// `true` once a real tester instance exists.
    fn is_loaded(&self) -> bool;

    /// `true` when the owning module is already active.
    fn is_owner_active(&self) -> bool;

    /// Produces the loaded form of this capability.
    fn materialize(&self) -> Result<Arc<dyn TesterCapability>, MaterializationError>;

    /// Invokes the tester. Fails for capabilities that are not loaded.
    fn test(
        &self,
        receiver: &dyn Receiver,
        property: &str,
        args: &[PropertyValue],
        expected: Option<&PropertyValue>,
    ) -> DispatchResult<bool>;

    /// Declaration this capability was built from, if any.
    fn registration(&self) -> Option<&TesterRegistration>;
}

/// Materialized tester bound to its declaration.
#[derive(Clone)]
pub struct LoadedTester {
    registration: Arc<TesterRegistration>,
    tester: Arc<dyn PropertyTester>,
}

impl LoadedTester {
    pub fn new(registration: Arc<TesterRegistration>, tester: Arc<dyn PropertyTester>) -> Self {
        Self {
            registration,
            tester,
        }
    }
}

impl Debug for LoadedTester {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedTester")
            .field("id", &self.registration.id)
            .field("namespace", &self.registration.namespace)
            .finish_non_exhaustive()
    }
}

impl TesterCapability for LoadedTester {
    fn handles(&self, namespace: &str, property: &str) -> bool {
        self.registration.handles(namespace, property)
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn is_owner_active(&self) -> bool {
        true
    }

    fn materialize(&self) -> Result<Arc<dyn TesterCapability>, MaterializationError> {
        Ok(Arc::new(self.clone()))
    }

    fn test(
        &self,
        receiver: &dyn Receiver,
        property: &str,
        args: &[PropertyValue],
        expected: Option<&PropertyValue>,
    ) -> DispatchResult<bool> {
        Ok(self.tester.test(receiver, property, args, expected))
    }

    fn registration(&self) -> Option<&TesterRegistration> {
        Some(&self.registration)
    }
}

/// Capability that never handles anything.
///
/// Stands in for slots whose descriptor failed to materialize.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTester;

impl TesterCapability for NullTester {
    fn handles(&self, _namespace: &str, _property: &str) -> bool {
        false
    }

    fn is_loaded(&self) -> bool {
        true
    }

    fn is_owner_active(&self) -> bool {
        true
    }

    fn materialize(&self) -> Result<Arc<dyn TesterCapability>, MaterializationError> {
        Ok(Arc::new(NullTester))
    }

    fn test(
        &self,
        _receiver: &dyn Receiver,
        property: &str,
        _args: &[PropertyValue],
        _expected: Option<&PropertyValue>,
    ) -> DispatchResult<bool> {
        Err(DispatchError::NullTesterInvoked {
            property: property.to_string(),
        })
    }

    fn registration(&self) -> Option<&TesterRegistration> {
        None
    }
}
