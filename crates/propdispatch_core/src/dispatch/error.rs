//! Dispatch error taxonomy.

use crate::model::type_name::{ReceiverType, TypeName};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors surfaced by binding resolution and invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No tester anywhere in the receiver's type chain handles the property.
    ///
    /// `failed_testers` lists candidates that matched but failed to
    /// materialize during this resolution.
    Resolution {
        receiver_type: ReceiverType,
        namespace: String,
        property: String,
        failed_testers: Vec<String>,
    },
    /// The tester registry failed while the chain was being walked.
    ///
    /// `type_name` is the type whose testers could not be enumerated; it may
    /// be a supertype of the receiver.
    Registry {
        receiver_type: ReceiverType,
        type_name: TypeName,
        message: String,
    },
    /// A provisional binding was invoked before its tester was loaded.
    InvocationOnUnloadedTester { tester_id: String, property: String },
    /// The binding holds the null tester, which handles no property.
    NullTesterInvoked { property: String },
}

impl DispatchError {
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }

    pub fn is_registry(&self) -> bool {
        matches!(self, Self::Registry { .. })
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolution {
                receiver_type,
                namespace,
                property,
                failed_testers,
            } => {
                write!(
                    f,
                    "no property tester found for {receiver_type} handling {namespace}.{property}"
                )?;
                if !failed_testers.is_empty() {
                    write!(f, " (failed to load: {})", failed_testers.join(", "))?;
                }
                Ok(())
            }
            Self::Registry {
                receiver_type,
                type_name,
                message,
            } => write!(
                f,
                "tester registry failed while resolving {receiver_type} at {type_name}: {message}"
            ),
            Self::InvocationOnUnloadedTester {
                tester_id,
                property,
            } => write!(
                f,
                "property tester {tester_id} is not loaded; cannot test {property}"
            ),
            Self::NullTesterInvoked { property } => {
                write!(f, "null tester cannot test {property}")
            }
        }
    }
}

impl Error for DispatchError {}
