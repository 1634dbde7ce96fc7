use migration::stubs::InMemoryWorldStore;
use migration::{MigrationService, RunnerConfig};
use serde_json::json;
use std::sync::Arc;
use world_domain::{DocumentKind, SchemaVersion, World, WorldStubs};
use world_migrations::shared_registry;

fn embedded(world: &World, actor: &str, item: &str) -> serde_json::Value {
  let actor = world.get(DocumentKind::Actor, actor).expect("actor");
  actor.source()
       .embedded_values()
       .iter()
       .find(|i| i["_id"] == json!(item))
       .cloned()
       .expect("item embebido")
}

#[tokio::test]
async fn catalog_migrates_a_legacy_world_end_to_end() {
  let store = Arc::new(InMemoryWorldStore::new(WorldStubs::sample_world().expect("mundo")));
  let service = MigrationService::new(store.clone(), shared_registry().expect("catálogo"), RunnerConfig::default());

  let summary = service.migrate(None, false).await.expect("corrida");
  assert!(!summary.has_failures());
  assert!(summary.world_stamped);
  // 2 actores x 2 pasos, 4 items x 2 pasos, 5 documentos sueltos
  assert_eq!(summary.handler_invocations, 17);

  let world = store.snapshot();
  assert_eq!(world.schema_version(), SchemaVersion::new(0.5).unwrap());

  let hero = world.get(DocumentKind::Actor, "act-hero").expect("hero").source();
  assert_eq!(hero.get_path("system.traits"), Some(&json!(["brave", "stubborn"])));
  assert_eq!(hero.get_path("system.details.xp"), Some(&json!({"value": 1200, "max": 2700})));
  assert!(!hero.contains_path("system.xp"));

  let goblin = world.get(DocumentKind::Actor, "act-goblin").expect("goblin").source();
  assert_eq!(goblin.get_path("system.xp"), Some(&json!(50)));
  assert_eq!(goblin.get_path("system.traits"), Some(&json!(["sneaky"])));
  assert_eq!(embedded(&world, "act-goblin", "itm-claws")["system"]["identified"], json!(true));

  let sword = embedded(&world, "act-hero", "itm-sword");
  assert_eq!(sword["system"]["quantity"], json!(1));
  assert_eq!(sword["system"]["identified"], json!(false));
  assert!(sword["system"].get("qty").is_none());
  assert_eq!(embedded(&world, "act-hero", "itm-rations")["system"]["quantity"], json!(5));

  let potion = world.get(DocumentKind::Item, "itm-potion").expect("potion").source();
  assert_eq!(potion.get_path("system.quantity"), Some(&json!(3)));
  assert_eq!(potion.get_path("system.identified"), Some(&json!(false)));

  let table = world.get(DocumentKind::RollTable, "tbl-loot").expect("tabla").source();
  let weights: Vec<_> = table.get_path("results")
                             .and_then(|r| r.as_array())
                             .expect("results")
                             .iter()
                             .map(|r| r["weight"].clone())
                             .collect();
  assert_eq!(weights, vec![json!(1), json!(3)]);

  let journal = world.get(DocumentKind::JournalEntry, "jrn-intro").expect("journal").source();
  assert_eq!(journal.get_path("text.content"), Some(&json!("<p>Welcome</p>")));
  assert!(journal.get("content").is_none());

  let mac = world.get(DocumentKind::Macro, "mac-roll").expect("macro").source();
  assert_eq!(mac.get("command"), Some(&json!("roll('1d20')")));
  assert_eq!(mac.get("type"), Some(&json!("script")));

  let setting = world.get(DocumentKind::Setting, "set-initiative").expect("setting").source();
  assert_eq!(setting.get("key"), Some(&json!("world.initiativeDice")));

  let user = world.get(DocumentKind::User, "usr-gm").expect("user").source();
  assert_eq!(user.get("color"), Some(&json!("#ff6400")));
  assert!(user.get_path("flags.legacy").is_none());

  let again = service.migrate(None, false).await.expect("segunda corrida");
  assert_eq!(again.handler_invocations, 0);
  assert!(service.status().await.expect("estado").is_current());
}

#[test]
fn dry_run_leaves_the_store_untouched() {
  let store = Arc::new(InMemoryWorldStore::new(WorldStubs::sample_world().expect("mundo")));
  let service = MigrationService::new(store.clone(), shared_registry().expect("catálogo"), RunnerConfig::sequential());
  let summary = tokio_test::block_on(service.migrate(None, true)).expect("dry-run");
  assert!(summary.total_migrated() > 0);
  assert_eq!(store.commit_count(), 0);
  assert_eq!(store.snapshot().schema_version(), SchemaVersion::ZERO);
}
