//! Tester registration declaration and validation.
//!
//! # Responsibility
//! - Describe one property tester as declared by an owning module.
//! - Validate declaration-level invariants before the engine sees it.
//!
//! # Invariants
//! - `properties` is non-empty, ordered, and free of duplicates.
//! - Property names never contain commas or whitespace.
//! - `id` and `owner` follow dotted lowercase identifier rules.
//! - Identifier-like fields carry no surrounding whitespace, so lookups and
//!   `handles` compare them exactly.

use crate::model::type_name::TypeName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declarative property tester registration.
///
/// Construction data (`class`) is opaque to the engine and only interpreted
/// by the module-activation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesterRegistration {
    /// Stable registration identifier, e.g. `builtin.files.tester`.
    pub id: String,
    /// Identifier of the module that declares and owns the tester.
    pub owner: String,
    /// Exact type the tester is declared for.
    #[serde(rename = "type")]
    pub type_name: TypeName,
    /// Namespace the property names are scoped under.
    pub namespace: String,
    /// Property names handled by the tester.
    pub properties: Vec<String>,
    /// Construction data handed to the owning module on materialization.
    pub class: String,
}

impl TesterRegistration {
    /// Builds a registration from its comma-separated declaration form.
    ///
    /// Text fields are trimmed and empty property segments dropped; the
    /// result is not validated.
    pub fn from_declaration(
        id: impl Into<String>,
        owner: impl Into<String>,
        type_name: TypeName,
        namespace: impl Into<String>,
        properties: &str,
        class: impl Into<String>,
    ) -> Self {
        Self {
            id: trimmed(id.into()),
            owner: trimmed(owner.into()),
            type_name,
            namespace: trimmed(namespace.into()),
            properties: parse_property_list(properties),
            class: trimmed(class.into()),
        }
    }

    /// Returns `true` when this tester claims `(namespace, property)`.
    pub fn handles(&self, namespace: &str, property: &str) -> bool {
        self.namespace == namespace && self.properties.iter().any(|name| name == property)
    }

    /// Comma-separated declaration form of `properties`.
    pub fn properties_declaration(&self) -> String {
        self.properties.join(",")
    }

    /// Validates declaration-level registration invariants.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.id.trim().is_empty() {
            return Err(RegistrationError::EmptyId);
        }
        if !is_valid_dotted_id(&self.id) {
            return Err(RegistrationError::InvalidId(self.id.clone()));
        }
        if self.owner.trim().is_empty() {
            return Err(RegistrationError::EmptyOwner);
        }
        if !is_valid_dotted_id(&self.owner) {
            return Err(RegistrationError::InvalidOwner(self.owner.clone()));
        }
        if self.namespace.trim().is_empty() {
            return Err(RegistrationError::EmptyNamespace);
        }
        if self.namespace.chars().any(char::is_whitespace) {
            return Err(RegistrationError::InvalidNamespace(self.namespace.clone()));
        }
        if self.class.trim().is_empty() {
            return Err(RegistrationError::EmptyClass);
        }
        if self.class.trim() != self.class {
            return Err(RegistrationError::InvalidClass(self.class.clone()));
        }
        if self.properties.is_empty() {
            return Err(RegistrationError::MissingProperties);
        }

        let mut dedup = BTreeSet::<&str>::new();
        for property in &self.properties {
            if property.trim().is_empty() {
                return Err(RegistrationError::EmptyProperty);
            }
            if property.contains(',') || property.chars().any(char::is_whitespace) {
                return Err(RegistrationError::InvalidProperty(property.clone()));
            }
            if !dedup.insert(property.as_str()) {
                return Err(RegistrationError::DuplicateProperty(property.clone()));
            }
        }
        Ok(())
    }
}

/// Splits a comma-separated property list, trimming and dropping blanks.
pub fn parse_property_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn trimmed(value: String) -> String {
    if value.trim().len() == value.len() {
        value
    } else {
        value.trim().to_string()
    }
}

fn is_valid_dotted_id(value: &str) -> bool {
    let mut chars = value.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return false,
    };
    if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
        return false;
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

/// Registration validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    EmptyId,
    InvalidId(String),
    EmptyOwner,
    InvalidOwner(String),
    EmptyNamespace,
    InvalidNamespace(String),
    EmptyClass,
    InvalidClass(String),
    MissingProperties,
    EmptyProperty,
    InvalidProperty(String),
    DuplicateProperty(String),
    InvalidTypeName(String),
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "registration id must not be empty"),
            Self::InvalidId(value) => write!(f, "registration id is invalid: {value}"),
            Self::EmptyOwner => write!(f, "registration owner must not be empty"),
            Self::InvalidOwner(value) => write!(f, "registration owner is invalid: {value}"),
            Self::EmptyNamespace => write!(f, "registration namespace must not be empty"),
            Self::InvalidNamespace(value) => {
                write!(f, "registration namespace is invalid: {value:?}")
            }
            Self::EmptyClass => write!(f, "registration class must not be empty"),
            Self::InvalidClass(value) => {
                write!(f, "registration class has surrounding whitespace: {value:?}")
            }
            Self::MissingProperties => write!(f, "registration properties must not be empty"),
            Self::EmptyProperty => write!(f, "registration contains empty property name"),
            Self::InvalidProperty(value) => {
                write!(f, "registration property name is invalid: {value:?}")
            }
            Self::DuplicateProperty(value) => {
                write!(f, "registration property is duplicated: {value}")
            }
            Self::InvalidTypeName(value) => {
                write!(f, "registration type name is invalid: {value}")
            }
        }
    }
}

impl Error for RegistrationError {}

#[cfg(test)]
mod tests {
    use super::{parse_property_list, RegistrationError, TesterRegistration};
    use crate::model::type_name::TypeName;

    fn valid_registration() -> TesterRegistration {
        TesterRegistration::from_declaration(
            "builtin.files.tester",
            "builtin.files",
            TypeName::new("files.File").expect("valid type name"),
            "files",
            "readOnly, extension ,hidden",
            "FileTester",
        )
    }

    #[test]
    fn parses_declaration_form() {
        let registration = valid_registration();
        assert_eq!(
            registration.properties,
            vec!["readOnly", "extension", "hidden"]
        );
        assert_eq!(
            registration.properties_declaration(),
            "readOnly,extension,hidden"
        );
        assert!(registration.validate().is_ok());
    }

    #[test]
    fn property_list_drops_blank_segments() {
        assert_eq!(parse_property_list(" a,, b ,"), vec!["a", "b"]);
        assert!(parse_property_list(" , ").is_empty());
    }

    #[test]
    fn handles_requires_namespace_and_property() {
        let registration = valid_registration();
        assert!(registration.handles("files", "readOnly"));
        assert!(!registration.handles("editor", "readOnly"));
        assert!(!registration.handles("files", "writable"));
    }

    #[test]
    fn rejects_missing_properties() {
        let mut registration = valid_registration();
        registration.properties.clear();
        assert_eq!(
            registration.validate().unwrap_err(),
            RegistrationError::MissingProperties
        );
    }

    #[test]
    fn rejects_duplicate_properties() {
        let mut registration = valid_registration();
        registration.properties.push("hidden".to_string());
        assert_eq!(
            registration.validate().unwrap_err(),
            RegistrationError::DuplicateProperty("hidden".to_string())
        );
    }

    #[test]
    fn rejects_property_with_comma_or_whitespace() {
        let mut registration = valid_registration();
        registration.properties = vec!["read only".to_string()];
        assert!(matches!(
            registration.validate(),
            Err(RegistrationError::InvalidProperty(_))
        ));

        registration.properties = vec!["a,b".to_string()];
        assert!(matches!(
            registration.validate(),
            Err(RegistrationError::InvalidProperty(_))
        ));
    }

    #[test]
    fn rejects_invalid_identifiers() {
        let mut registration = valid_registration();
        registration.id = "Builtin Files".to_string();
        assert!(matches!(
            registration.validate(),
            Err(RegistrationError::InvalidId(_))
        ));

        let mut registration = valid_registration();
        registration.owner = "builtin..files".to_string();
        assert!(matches!(
            registration.validate(),
            Err(RegistrationError::InvalidOwner(_))
        ));
    }

    #[test]
    fn declaration_form_trims_text_fields() {
        let registration = TesterRegistration::from_declaration(
            " builtin.files.tester ",
            "builtin.files\n",
            TypeName::new("files.File").expect("valid type name"),
            "files ",
            "readOnly",
            " FileTester",
        );
        assert_eq!(registration.id, "builtin.files.tester");
        assert_eq!(registration.owner, "builtin.files");
        assert_eq!(registration.class, "FileTester");
        assert!(registration.validate().is_ok());
        assert!(registration.handles("files", "readOnly"));
    }

    #[test]
    fn rejects_surrounding_whitespace_in_stored_fields() {
        let mut registration = valid_registration();
        registration.namespace = "files ".to_string();
        assert_eq!(
            registration.validate().unwrap_err(),
            RegistrationError::InvalidNamespace("files ".to_string())
        );

        let mut registration = valid_registration();
        registration.id = "builtin.files.tester ".to_string();
        assert!(matches!(
            registration.validate(),
            Err(RegistrationError::InvalidId(_))
        ));

        let mut registration = valid_registration();
        registration.class = "FileTester ".to_string();
        assert_eq!(
            registration.validate().unwrap_err(),
            RegistrationError::InvalidClass("FileTester ".to_string())
        );
    }

    #[test]
    fn rejects_blank_namespace_and_class() {
        let mut registration = valid_registration();
        registration.namespace = "  ".to_string();
        assert_eq!(
            registration.validate().unwrap_err(),
            RegistrationError::EmptyNamespace
        );

        let mut registration = valid_registration();
        registration.class = String::new();
        assert_eq!(
            registration.validate().unwrap_err(),
            RegistrationError::EmptyClass
        );
    }
}
