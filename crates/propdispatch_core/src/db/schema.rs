//! Registration store schema steps.
//!
//! # Invariants
//! - Step versions are contiguous from 1 and strictly increasing.
//! - All pending steps and the version bump commit together.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "tester_registrations",
        sql: include_str!("sql/0001_tester_registrations.sql"),
    },
    SchemaStep {
        version: 2,
        name: "type_index",
        sql: include_str!("sql/0002_type_index.sql"),
    },
];

/// Schema version written by this binary.
pub const SCHEMA_VERSION: u32 = SCHEMA_STEPS.len() as u32;

/// Version recorded in the store, `0` for a fresh database.
pub fn stored_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings the store up to `SCHEMA_VERSION`; returns the number of steps run.
pub(crate) fn upgrade(conn: &mut Connection) -> DbResult<usize> {
    let found = stored_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    let pending: Vec<&SchemaStep> = SCHEMA_STEPS
        .iter()
        .filter(|step| step.version > found)
        .collect();
    if pending.is_empty() {
        return Ok(0);
    }

    let tx = conn.transaction()?;
    for step in &pending {
        tx.execute_batch(step.sql)?;
        debug!(
            "event=registry_schema_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(pending.len())
}
