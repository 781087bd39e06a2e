//! Tester registration sources.
//!
//! # Responsibility
//! - Enumerate tester registrations declared for one exact type.
//! - Report registration changes so the engine can invalidate its state.
//!
//! # Invariants
//! - Enumeration order is stable declaration order.
//! - Entries that fail validation are reported, not silently dropped.

use crate::db::DbError;
use crate::model::registration::{RegistrationError, TesterRegistration};
use crate::model::type_name::TypeName;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryTesterRegistry;
pub use sqlite::SqliteTesterRegistry;

/// One enumerated registration, or the reason it could not be constructed.
pub type RegistryEntry = Result<TesterRegistration, RegistrationError>;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Source of tester registrations, keyed by exact declared type.
pub trait TesterRegistry: Send + Sync {
    /// Returns every registration declared for `type_name`, in declaration order.
    fn enumerate_testers(&self, type_name: &TypeName) -> RegistryResult<Vec<RegistryEntry>>;
}

/// Kind of registry mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChangeKind {
    Added,
    Removed,
}

/// Notification that tester registrations changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryChangeEvent {
    pub kind: RegistryChangeKind,
    pub registration_id: String,
    pub type_name: TypeName,
}

impl RegistryChangeEvent {
    pub fn added(registration: &TesterRegistration) -> Self {
        Self {
            kind: RegistryChangeKind::Added,
            registration_id: registration.id.clone(),
            type_name: registration.type_name.clone(),
        }
    }

    pub fn removed(registration: &TesterRegistration) -> Self {
        Self {
            kind: RegistryChangeKind::Removed,
            registration_id: registration.id.clone(),
            type_name: registration.type_name.clone(),
        }
    }
}

/// Registry mutation and lookup errors.
#[derive(Debug)]
pub enum RegistryError {
    InvalidRegistration(RegistrationError),
    DuplicateRegistrationId(String),
    RegistrationNotFound(String),
    Db(DbError),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRegistration(err) => write!(f, "invalid tester registration: {err}"),
            Self::DuplicateRegistrationId(value) => {
                write!(f, "tester registration id already registered: {value}")
            }
            Self::RegistrationNotFound(value) => {
                write!(f, "tester registration not found: {value}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidRegistration(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::DuplicateRegistrationId(_) => None,
            Self::RegistrationNotFound(_) => None,
        }
    }
}

impl From<RegistrationError> for RegistryError {
    fn from(value: RegistrationError) -> Self {
        Self::InvalidRegistration(value)
    }
}

impl From<DbError> for RegistryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RegistryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
