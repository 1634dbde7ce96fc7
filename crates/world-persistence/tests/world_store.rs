use migration::{MigrationService, RunnerConfig};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;
use world_domain::{DocumentKind, DocumentSource, SchemaVersion, WorldStubs};
use world_persistence::DieselWorldStore;

// Base SQLite temporal en un archivo propio por prueba.
fn temp_store() -> (DieselWorldStore, PathBuf) {
  let path = std::env::temp_dir().join(format!("world_test_{}.sqlite3", Uuid::new_v4()));
  let store = DieselWorldStore::new(path.to_str().unwrap()).expect("abrir base");
  (store, path)
}

fn cleanup(path: PathBuf) {
  let _ = std::fs::remove_file(&path);
  for suffix in ["-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
  }
}

#[test]
fn import_and_load_preserve_documents_and_order() {
  let (store, path) = temp_store();
  let world = WorldStubs::sample_world().expect("mundo");
  let written = store.import_world(&world).expect("importar");
  assert_eq!(written, world.len());
  assert_eq!(store.document_count().expect("conteo"), world.len() as i64);

  let loaded = store.load().expect("cargar");
  assert_eq!(loaded, world);
  assert_eq!(store.world_version().expect("versión"), SchemaVersion::ZERO);

  let hero = store.get_document(DocumentKind::Actor, "act-hero").expect("consulta").expect("hero");
  assert_eq!(hero.embedded_item_ids(), vec!["itm-sword".to_string(), "itm-rations".to_string()]);
  assert!(store.get_document(DocumentKind::Actor, "nadie").expect("consulta").is_none());
  cleanup(path);
}

#[test]
fn upsert_keeps_position_and_appends_new_documents() {
  let (store, path) = temp_store();
  store.import_world(&WorldStubs::sample_world().expect("mundo")).expect("importar");

  let mut hero = store.get_document(DocumentKind::Actor, "act-hero").expect("consulta").expect("hero").into_source();
  hero.set_schema_version(SchemaVersion::new(0.3).unwrap());
  hero.insert("name", json!("Hero renombrado"));
  store.upsert_document(DocumentKind::Actor, "act-hero", &hero).expect("upsert");
  let fresh = WorldStubs::actor("act-new", "npc", -1.0, vec![]);
  store.upsert_document(DocumentKind::Actor, "act-new", &DocumentSource::from_value(fresh).unwrap()).expect("insert");

  let world = store.load().expect("cargar");
  let ids: Vec<&str> = world.documents(DocumentKind::Actor).map(|d| d.id()).collect();
  assert_eq!(ids, vec!["act-hero", "act-goblin", "act-new"]);
  let hero = world.get(DocumentKind::Actor, "act-hero").expect("hero");
  assert_eq!(hero.stamp(), SchemaVersion::new(0.3).unwrap());
  assert_eq!(hero.source().get("name"), Some(&json!("Hero renombrado")));
  cleanup(path);
}

#[tokio::test]
async fn migration_service_runs_against_sqlite() {
  let (store, path) = temp_store();
  store.import_world(&WorldStubs::sample_world().expect("mundo")).expect("importar");
  let store = Arc::new(store);
  let registry = world_migrations::shared_registry().expect("catálogo");
  let service = MigrationService::new(store.clone(), registry.clone(), RunnerConfig::default());

  let dry = service.migrate(None, true).await.expect("dry-run");
  assert!(dry.total_migrated() > 0);
  assert_eq!(store.world_version().expect("versión"), SchemaVersion::ZERO);

  let summary = service.migrate(None, false).await.expect("corrida");
  assert!(summary.world_stamped);
  assert_eq!(summary.committed, summary.dirty_documents);
  assert_eq!(store.world_version().expect("versión"), registry.latest_version());

  let setting = store.get_document(DocumentKind::Setting, "set-initiative").expect("consulta").expect("setting");
  assert_eq!(setting.source().get("key"), Some(&json!("world.initiativeDice")));
  let goblin = store.get_document(DocumentKind::Actor, "act-goblin").expect("consulta").expect("goblin");
  assert_eq!(goblin.source().embedded_values()[0]["system"]["identified"], json!(true));

  let again = service.migrate(None, false).await.expect("segunda corrida");
  assert_eq!(again.handler_invocations, 0);
  assert!(service.status().await.expect("estado").is_current());
  cleanup(path);
}
