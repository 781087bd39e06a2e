//! Receiver type identity.
//!
//! # Responsibility
//! - Name receiver types independently of any concrete host object.
//! - Distinguish instance receivers from type-value receivers.
//!
//! # Invariants
//! - A `TypeName` is never empty and carries no surrounding whitespace.
//! - `TypeName::root()` is the single parentless type.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::borrow::Borrow;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Identity string of the well-known root type.
pub const ROOT_TYPE_NAME: &str = "object";

/// Identity of one receiver type, e.g. `editor.TextSelection`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Creates a type name after trimming; rejects blank input.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeNameError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TypeNameError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(TypeNameError::ContainsWhitespace(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The root of every type chain.
    pub fn root() -> Self {
        Self(ROOT_TYPE_NAME.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_TYPE_NAME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TypeName {
    type Error = TypeNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for TypeName {
    type Error = TypeNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TypeName> for String {
    fn from(value: TypeName) -> Self {
        value.0
    }
}

/// Type name construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNameError {
    Empty,
    ContainsWhitespace(String),
}

impl Display for TypeNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "type name must not be empty"),
            Self::ContainsWhitespace(value) => {
                write!(f, "type name must not contain whitespace: {value}")
            }
        }
    }
}

impl Error for TypeNameError {}

/// Whether a receiver is an instance of a type or the type value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverKind {
    Instance,
    /// Static dispatch: no inheritance walk is performed.
    Type,
}

/// Concrete type identity of a receiver as seen by the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReceiverType {
    pub type_name: TypeName,
    pub kind: ReceiverKind,
}

impl ReceiverType {
    pub fn instance(type_name: TypeName) -> Self {
        Self {
            type_name,
            kind: ReceiverKind::Instance,
        }
    }

    pub fn type_value(type_name: TypeName) -> Self {
        Self {
            type_name,
            kind: ReceiverKind::Type,
        }
    }

    pub fn is_static(&self) -> bool {
        self.kind == ReceiverKind::Type
    }
}

impl Display for ReceiverType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ReceiverKind::Instance => write!(f, "{}", self.type_name),
            ReceiverKind::Type => write!(f, "type<{}>", self.type_name),
        }
    }
}

/// Host object that property testers evaluate.
///
/// Testers downcast through `as_any` to reach the concrete object.
pub trait Receiver: Send + Sync {
    fn receiver_type(&self) -> ReceiverType;
    fn as_any(&self) -> &dyn Any;
}
