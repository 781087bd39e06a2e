//! Host type system collaborator.
//!
//! # Responsibility
//! - Report the immediate supertypes of a receiver type in declaration order.
//!
//! # Invariants
//! - The supertype graph is acyclic and every chain ends at `TypeName::root()`.
//! - `StaticTypeHierarchy` only accepts parents that are already declared,
//!   which makes cycles impossible by construction.

use crate::model::type_name::TypeName;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Supplies immediate supertypes for receiver types.
pub trait TypeHierarchy: Send + Sync {
    /// Returns the declared superclass first, then interfaces, in order.
    ///
    /// Returns an empty list only for the root type.
    fn supertypes(&self, type_name: &TypeName) -> Vec<TypeName>;
}

/// Declaration-based type hierarchy.
///
/// Types that were never declared are treated as direct children of the
/// root type.
#[derive(Debug, Default, Clone)]
pub struct StaticTypeHierarchy {
    parents: BTreeMap<TypeName, Vec<TypeName>>,
}

impl StaticTypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `type_name` with its immediate supertypes.
    ///
    /// An empty `parents` list means the type extends the root directly.
    pub fn declare(
        &mut self,
        type_name: TypeName,
        parents: Vec<TypeName>,
    ) -> Result<(), HierarchyError> {
        if type_name.is_root() {
            return Err(HierarchyError::RootRedeclared);
        }
        if self.parents.contains_key(&type_name) {
            return Err(HierarchyError::DuplicateType(type_name));
        }

        let mut seen = Vec::with_capacity(parents.len());
        for parent in &parents {
            if parent == &type_name {
                return Err(HierarchyError::SelfParent(type_name));
            }
            if !parent.is_root() && !self.parents.contains_key(parent) {
                return Err(HierarchyError::UnknownParent {
                    type_name,
                    parent: parent.clone(),
                });
            }
            if seen.contains(parent) {
                return Err(HierarchyError::DuplicateParent {
                    type_name,
                    parent: parent.clone(),
                });
            }
            seen.push(parent.clone());
        }

        let parents = if parents.is_empty() {
            vec![TypeName::root()]
        } else {
            parents
        };
        self.parents.insert(type_name, parents);
        Ok(())
    }

    pub fn is_declared(&self, type_name: &TypeName) -> bool {
        type_name.is_root() || self.parents.contains_key(type_name)
    }
}

impl TypeHierarchy for StaticTypeHierarchy {
    fn supertypes(&self, type_name: &TypeName) -> Vec<TypeName> {
        if type_name.is_root() {
            return Vec::new();
        }
        self.parents
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| vec![TypeName::root()])
    }
}

/// Type declaration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    RootRedeclared,
    DuplicateType(TypeName),
    SelfParent(TypeName),
    UnknownParent { type_name: TypeName, parent: TypeName },
    DuplicateParent { type_name: TypeName, parent: TypeName },
}

impl Display for HierarchyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RootRedeclared => write!(f, "root type cannot be redeclared"),
            Self::DuplicateType(value) => write!(f, "type already declared: {value}"),
            Self::SelfParent(value) => write!(f, "type cannot extend itself: {value}"),
            Self::UnknownParent { type_name, parent } => {
                write!(f, "type {type_name} extends undeclared type {parent}")
            }
            Self::DuplicateParent { type_name, parent } => {
                write!(f, "type {type_name} lists supertype {parent} twice")
            }
        }
    }
}

impl Error for HierarchyError {}

#[cfg(test)]
mod tests {
    use super::{HierarchyError, StaticTypeHierarchy, TypeHierarchy};
    use crate::model::type_name::TypeName;

    fn name(value: &str) -> TypeName {
        TypeName::new(value).expect("valid type name")
    }

    #[test]
    fn undeclared_types_extend_root() {
        let hierarchy = StaticTypeHierarchy::new();
        assert_eq!(hierarchy.supertypes(&name("Loose")), vec![TypeName::root()]);
        assert!(hierarchy.supertypes(&TypeName::root()).is_empty());
    }

    #[test]
    fn keeps_superclass_before_interfaces() {
        let mut hierarchy = StaticTypeHierarchy::new();
        hierarchy
            .declare(name("Resource"), vec![])
            .expect("declare Resource");
        hierarchy
            .declare(name("Adaptable"), vec![])
            .expect("declare Adaptable");
        hierarchy
            .declare(name("File"), vec![name("Resource"), name("Adaptable")])
            .expect("declare File");

        assert_eq!(
            hierarchy.supertypes(&name("File")),
            vec![name("Resource"), name("Adaptable")]
        );
    }

    #[test]
    fn rejects_unknown_and_self_parents() {
        let mut hierarchy = StaticTypeHierarchy::new();
        let err = hierarchy
            .declare(name("File"), vec![name("Resource")])
            .expect_err("undeclared parent must fail");
        assert!(matches!(err, HierarchyError::UnknownParent { .. }));

        let err = hierarchy
            .declare(name("File"), vec![name("File")])
            .expect_err("self parent must fail");
        assert_eq!(err, HierarchyError::SelfParent(name("File")));
    }

    #[test]
    fn rejects_redeclaration() {
        let mut hierarchy = StaticTypeHierarchy::new();
        hierarchy.declare(name("File"), vec![]).expect("declare File");
        assert_eq!(
            hierarchy.declare(name("File"), vec![]),
            Err(HierarchyError::DuplicateType(name("File")))
        );
        assert_eq!(
            hierarchy.declare(TypeName::root(), vec![]),
            Err(HierarchyError::RootRedeclared)
        );
    }
}
