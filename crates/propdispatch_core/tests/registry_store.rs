use propdispatch_core::db::{open_store, stored_version, DbError, StoreLocation, SCHEMA_VERSION};
use propdispatch_core::{
    DispatchEngine, EngineConfig, ModuleState, ModuleTable, PropertyTester, PropertyValue,
    Receiver, ReceiverType, RegistryChangeKind, RegistryError, SqliteTesterRegistry,
    StaticTypeHierarchy, TesterRegistration, TesterRegistry, TypeName,
};
use rusqlite::Connection;
use std::sync::Arc;

fn registration(id: &str, type_name: &str, properties: &str) -> TesterRegistration {
    TesterRegistration::from_declaration(
        id,
        "builtin.files",
        TypeName::new(type_name).expect("valid type name"),
        "files",
        properties,
        "FileTester",
    )
}

#[test]
fn memory_store_applies_every_schema_step() {
    let conn = open_store(&StoreLocation::Memory).unwrap();

    assert_eq!(stored_version(&conn).unwrap(), SCHEMA_VERSION);
    assert_table_exists(&conn, "tester_registrations");
}

#[test]
fn registrations_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    let first = SqliteTesterRegistry::open(&path).unwrap();
    first
        .insert(&registration("files.readonly", "File", "readOnly"))
        .unwrap();
    first
        .insert(&registration("files.hidden", "File", "hidden"))
        .unwrap();
    drop(first);

    let second = SqliteTesterRegistry::open(&path).unwrap();
    let ids: Vec<String> = second
        .enumerate_testers(&TypeName::new("File").unwrap())
        .unwrap()
        .into_iter()
        .map(|entry| entry.unwrap().id)
        .collect();
    assert_eq!(ids, vec!["files.readonly", "files.hidden"]);
}

#[test]
fn opening_store_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_store(&StoreLocation::File(path.clone())).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        SqliteTesterRegistry::open(&path),
        Err(RegistryError::Db(DbError::SchemaTooNew { .. }))
    ));
}

#[test]
fn insert_rejects_invalid_registration() {
    let registry = SqliteTesterRegistry::open_in_memory().unwrap();
    let err = registry
        .insert(&registration("files.empty", "File", " , "))
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidRegistration(_)));
    assert_eq!(registry.len().unwrap(), 0);
}

struct ExtensionTester;

impl PropertyTester for ExtensionTester {
    fn test(
        &self,
        receiver: &dyn Receiver,
        _property: &str,
        args: &[PropertyValue],
        _expected: Option<&PropertyValue>,
    ) -> bool {
        let Some(file) = receiver.as_any().downcast_ref::<File>() else {
            return false;
        };
        args.first()
            .and_then(PropertyValue::as_str)
            .is_some_and(|extension| file.name.ends_with(extension))
    }
}

struct File {
    name: String,
}

impl Receiver for File {
    fn receiver_type(&self) -> ReceiverType {
        ReceiverType::instance(TypeName::new("File").expect("valid type name"))
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[test]
fn engine_resolves_testers_from_sqlite_store() {
    let registry = Arc::new(SqliteTesterRegistry::open_in_memory().unwrap());
    registry
        .insert(&registration("files.extension", "File", "extension"))
        .unwrap();

    let table = Arc::new(ModuleTable::new());
    table
        .declare_module("builtin.files", ModuleState::Active)
        .unwrap();
    table
        .register_factory("FileTester", || {
            Ok(Arc::new(ExtensionTester) as Arc<dyn PropertyTester>)
        })
        .unwrap();

    let engine = DispatchEngine::new(
        &EngineConfig::default(),
        registry.clone(),
        Arc::new(StaticTypeHierarchy::new()),
        table,
    )
    .unwrap();

    let file = File {
        name: "notes.md".to_string(),
    };
    let args = [PropertyValue::from(".md")];
    let binding = engine
        .get_binding(&file.receiver_type(), "files", "extension", false)
        .unwrap();
    assert!(binding.invoke(&file, &args, None).unwrap());

    let event = registry.remove("files.extension").unwrap();
    assert_eq!(event.kind, RegistryChangeKind::Removed);
    engine.on_registry_changed(&event);
    assert!(engine
        .get_binding(&file.receiver_type(), "files", "extension", false)
        .unwrap_err()
        .is_resolution());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
