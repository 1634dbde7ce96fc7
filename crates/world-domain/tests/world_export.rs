use serde_json::json;
use world_domain::{DocumentKind, SchemaVersion, World, WorldExport, WorldStubs};

#[test]
fn export_roundtrip_keeps_sources_and_order() {
  let world = WorldStubs::sample_world().expect("sample world");
  let raw = world.to_json_pretty().expect("serialize");
  let back = World::from_json_str(&raw).expect("parse");
  assert_eq!(back, world);
  let actors: Vec<&str> = back.documents(DocumentKind::Actor).map(|d| d.id()).collect();
  assert_eq!(actors, vec!["act-hero", "act-goblin"]);
}

#[test]
fn import_rejects_invalid_documents() {
  let export = json!({
    "id": "broken",
    "schemaVersion": 0.3,
    "actors": [{"_id": "a1", "items": [{"name": "sin id"}]}]
  });
  let raw = export.to_string();
  assert!(World::from_json_str(&raw).is_err());

  let export = json!({"id": "w", "schemaVersion": -1});
  assert!(World::from_json_str(&export.to_string()).is_err());
}

#[test]
fn missing_collections_default_to_empty() {
  let raw = json!({"id": "w", "users": [{"_id": "u1", "schemaVersion": 0.5}]}).to_string();
  let world = World::from_json_str(&raw).expect("parse");
  assert_eq!(world.schema_version(), SchemaVersion::ZERO);
  assert_eq!(world.len(), 1);
  let export = WorldExport::from(&world);
  assert!(export.actors.is_empty());
  assert_eq!(export.users.len(), 1);
}
