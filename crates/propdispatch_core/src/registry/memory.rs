//! In-process tester registry.

use super::{RegistryChangeEvent, RegistryEntry, RegistryError, RegistryResult, TesterRegistry};
use crate::model::registration::TesterRegistration;
use crate::model::type_name::TypeName;
use parking_lot::RwLock;

/// Registry holding validated registrations in declaration order.
#[derive(Debug, Default)]
pub struct InMemoryTesterRegistry {
    entries: RwLock<Vec<TesterRegistration>>,
}

impl InMemoryTesterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one tester after declaration validation.
    pub fn register(
        &self,
        registration: TesterRegistration,
    ) -> RegistryResult<RegistryChangeEvent> {
        registration.validate()?;
        let mut entries = self.entries.write();
        if entries.iter().any(|entry| entry.id == registration.id) {
            return Err(RegistryError::DuplicateRegistrationId(registration.id));
        }
        let event = RegistryChangeEvent::added(&registration);
        entries.push(registration);
        Ok(event)
    }

    /// Removes one registration by id.
    pub fn unregister(&self, registration_id: &str) -> RegistryResult<RegistryChangeEvent> {
        let mut entries = self.entries.write();
        let position = entries
            .iter()
            .position(|entry| entry.id == registration_id.trim())
            .ok_or_else(|| RegistryError::RegistrationNotFound(registration_id.to_string()))?;
        let removed = entries.remove(position);
        Ok(RegistryChangeEvent::removed(&removed))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn get(&self, registration_id: &str) -> Option<TesterRegistration> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.id == registration_id.trim())
            .cloned()
    }
}

impl TesterRegistry for InMemoryTesterRegistry {
    fn enumerate_testers(&self, type_name: &TypeName) -> RegistryResult<Vec<RegistryEntry>> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|entry| &entry.type_name == type_name)
            .cloned()
            .map(Ok)
            .collect())
    }
}
