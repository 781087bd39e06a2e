//! Resolved property bindings and their cache key.
//!
//! # Invariants
//! - Equality and hashing are structural over `PropertyKey` only.
//! - A binding is immutable once built; per-call arguments produce new
//!   bindings that share the key and tester.

use crate::dispatch::error::{DispatchError, DispatchResult};
use crate::model::type_name::{Receiver, ReceiverType};
use crate::model::value::PropertyValue;
use crate::tester::TesterCapability;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Cache key: receiver type identity, namespace, and property name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKey {
    pub receiver_type: ReceiverType,
    pub namespace: String,
    pub property: String,
}

impl PropertyKey {
    pub fn new(
        receiver_type: ReceiverType,
        namespace: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            receiver_type,
            namespace: namespace.into(),
            property: property.into(),
        }
    }
}

impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{}.{}",
            self.receiver_type, self.namespace, self.property
        )
    }
}

/// Outcome of evaluating a binding without treating "not loaded" as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationResult {
    True,
    False,
    /// The bound tester's owner is inactive and activation was not forced.
    NotLoaded,
}

impl From<bool> for EvaluationResult {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}

/// Resolved, invocable unit returned by the dispatch engine.
#[derive(Debug, Clone)]
pub struct PropertyBinding {
    key: PropertyKey,
    tester: Arc<dyn TesterCapability>,
    force_activation: bool,
    args: Vec<PropertyValue>,
    expected: Option<PropertyValue>,
}

impl PropertyBinding {
    pub(crate) fn new(
        key: PropertyKey,
        tester: Arc<dyn TesterCapability>,
        force_activation: bool,
    ) -> Self {
        Self {
            key,
            tester,
            force_activation,
            args: Vec::new(),
            expected: None,
        }
    }

    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    pub fn receiver_type(&self) -> &ReceiverType {
        &self.key.receiver_type
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn property(&self) -> &str {
        &self.key.property
    }

    /// Forced-activation flag in effect when the binding was resolved.
    pub fn force_activation(&self) -> bool {
        self.force_activation
    }

    /// `false` for provisional bindings.
    pub fn is_loaded(&self) -> bool {
        self.tester.is_loaded()
    }

    /// Identifier of the bound tester registration.
    pub fn tester_id(&self) -> Option<&str> {
        self.tester.registration().map(|registration| registration.id.as_str())
    }

    pub fn args(&self) -> &[PropertyValue] {
        &self.args
    }

    pub fn expected(&self) -> Option<&PropertyValue> {
        self.expected.as_ref()
    }

    /// Returns a copy carrying per-call arguments and expected value.
    pub fn with_call(&self, args: Vec<PropertyValue>, expected: Option<PropertyValue>) -> Self {
        Self {
            key: self.key.clone(),
            tester: Arc::clone(&self.tester),
            force_activation: self.force_activation,
            args,
            expected,
        }
    }

    /// Whether a cached binding may answer a request with `force_activation`.
    ///
    /// Provisional bindings only satisfy callers that do not force
    /// activation; a forcing caller must re-resolve.
    pub fn is_reusable_for(&self, force_activation: bool) -> bool {
        self.tester.is_loaded() || !force_activation
    }

    /// Runs the bound tester.
    ///
    /// # Errors
    /// - `InvocationOnUnloadedTester` when the binding is provisional.
    /// - `NullTesterInvoked` when the binding holds the null tester.
    pub fn invoke(
        &self,
        receiver: &dyn Receiver,
        args: &[PropertyValue],
        expected: Option<&PropertyValue>,
    ) -> DispatchResult<bool> {
        if !self.tester.is_loaded() {
            return Err(DispatchError::InvocationOnUnloadedTester {
                tester_id: self.tester_id().unwrap_or("unknown").to_string(),
                property: self.key.property.clone(),
            });
        }
        self.tester
            .test(receiver, &self.key.property, args, expected)
    }

    /// Runs the bound tester with the arguments stored by `with_call`,
    /// reporting provisional bindings as `NotLoaded`.
    pub fn evaluate(&self, receiver: &dyn Receiver) -> DispatchResult<EvaluationResult> {
        if !self.tester.is_loaded() {
            return Ok(EvaluationResult::NotLoaded);
        }
        self.invoke(receiver, &self.args, self.expected.as_ref())
            .map(EvaluationResult::from)
    }
}

impl PartialEq for PropertyBinding {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PropertyBinding {}

impl Hash for PropertyBinding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
