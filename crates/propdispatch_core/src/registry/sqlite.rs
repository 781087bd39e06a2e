//! SQLite-backed tester registry.
//!
//! # Responsibility
//! - Persist tester registrations across process restarts.
//! - Surface stored rows that no longer validate as failed entries.
//!
//! # Invariants
//! - Writes validate registrations before SQL mutations.
//! - Enumeration order is insertion order (`seq`).

use super::{
    RegistryChangeEvent, RegistryChangeKind, RegistryEntry, RegistryError, RegistryResult,
    TesterRegistry,
};
use crate::db::{open_store, StoreLocation};
use crate::model::registration::{parse_property_list, RegistrationError, TesterRegistration};
use crate::model::type_name::TypeName;
use log::warn;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const REGISTRATION_SELECT_SQL: &str = "SELECT
    id,
    owner,
    type_name,
    namespace,
    properties,
    class
FROM tester_registrations";

/// Raw stored row before validation.
struct StoredRegistration {
    id: String,
    owner: String,
    type_name: String,
    namespace: String,
    properties: String,
    class: String,
}

/// Tester registry persisted in SQLite.
pub struct SqliteTesterRegistry {
    conn: Mutex<Connection>,
}

impl SqliteTesterRegistry {
    /// Wraps a connection whose schema is already upgraded.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and upgrades) a registration store file.
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        Ok(Self::new(open_store(&StoreLocation::File(
            path.as_ref().to_path_buf(),
        ))?))
    }

    pub fn open_in_memory() -> RegistryResult<Self> {
        Ok(Self::new(open_store(&StoreLocation::Memory)?))
    }

    /// Persists one validated registration.
    pub fn insert(&self, registration: &TesterRegistration) -> RegistryResult<RegistryChangeEvent> {
        registration.validate()?;
        let conn = self.conn.lock();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tester_registrations WHERE id = ?1);",
            [registration.id.as_str()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(RegistryError::DuplicateRegistrationId(
                registration.id.clone(),
            ));
        }

        conn.execute(
            "INSERT INTO tester_registrations (
                id,
                owner,
                type_name,
                namespace,
                properties,
                class
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                registration.id.as_str(),
                registration.owner.as_str(),
                registration.type_name.as_str(),
                registration.namespace.as_str(),
                registration.properties_declaration(),
                registration.class.as_str(),
            ],
        )?;
        Ok(RegistryChangeEvent::added(registration))
    }

    /// Deletes one registration by id.
    ///
    /// Rows that no longer validate are removed too; the event is built from
    /// the stored id and type alone.
    pub fn remove(&self, registration_id: &str) -> RegistryResult<RegistryChangeEvent> {
        let conn = self.conn.lock();
        let (id, stored_type): (String, String) = conn
            .query_row(
                "SELECT id, type_name FROM tester_registrations WHERE id = ?1;",
                [registration_id.trim()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| RegistryError::RegistrationNotFound(registration_id.to_string()))?;

        conn.execute("DELETE FROM tester_registrations WHERE id = ?1;", [id.as_str()])?;

        // An unparseable type was never enumerable; report it against the root.
        let type_name = TypeName::new(stored_type).unwrap_or_else(|_| TypeName::root());
        Ok(RegistryChangeEvent {
            kind: RegistryChangeKind::Removed,
            registration_id: id,
            type_name,
        })
    }

    pub fn len(&self) -> RegistryResult<usize> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM tester_registrations;", [], |row| {
                row.get(0)
            })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl TesterRegistry for SqliteTesterRegistry {
    fn enumerate_testers(&self, type_name: &TypeName) -> RegistryResult<Vec<RegistryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{REGISTRATION_SELECT_SQL} WHERE type_name = ?1 ORDER BY seq ASC;"
        ))?;
        let rows = stmt.query_map([type_name.as_str()], map_stored_row)?;

        let mut entries = Vec::new();
        for row in rows {
            let stored = row?;
            let id = stored.id.clone();
            let entry = into_registration(stored);
            if let Err(err) = &entry {
                warn!(
                    "event=registry_row_invalid module=registry status=error id={} error={}",
                    id, err
                );
            }
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn map_stored_row(row: &Row<'_>) -> rusqlite::Result<StoredRegistration> {
    Ok(StoredRegistration {
        id: row.get(0)?,
        owner: row.get(1)?,
        type_name: row.get(2)?,
        namespace: row.get(3)?,
        properties: row.get(4)?,
        class: row.get(5)?,
    })
}

fn into_registration(stored: StoredRegistration) -> Result<TesterRegistration, RegistrationError> {
    let type_name = TypeName::new(stored.type_name.as_str())
        .map_err(|_| RegistrationError::InvalidTypeName(stored.type_name.clone()))?;
    let registration = TesterRegistration {
        id: stored.id,
        owner: stored.owner,
        type_name,
        namespace: stored.namespace,
        properties: parse_property_list(&stored.properties),
        class: stored.class,
    };
    registration.validate()?;
    Ok(registration)
}
