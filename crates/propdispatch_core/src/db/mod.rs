//! Persistence for tester registrations.
//!
//! The store is a single SQLite table versioned through `PRAGMA
//! user_version`; `schema` owns the upgrade steps and `store` owns
//! connection setup.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod schema;
mod store;

pub use schema::{stored_version, SCHEMA_VERSION};
pub use store::{open_store, StoreLocation};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    /// The connection itself could not be established.
    Open {
        location: String,
        source: rusqlite::Error,
    },
    Sqlite(rusqlite::Error),
    /// The store was written by a newer binary.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { location, source } => {
                write!(f, "cannot open registration store {location}: {source}")
            }
            Self::Sqlite(err) => write!(f, "registration store error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "registration store schema v{found} is newer than supported v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
