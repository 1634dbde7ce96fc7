use migration::stubs::InMemoryWorldStore;
use migration::{MigrationContext, MigrationRegistry, MigrationRunner, MigrationStep, OutcomeStatus, RunOptions, RunnerConfig};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use world_domain::{Document, DocumentKind, SchemaVersion, World, WorldStubs};

fn v(value: f64) -> SchemaVersion {
    SchemaVersion::new(value).expect("versión válida")
}

fn context(store: &Arc<InMemoryWorldStore>) -> MigrationContext {
    MigrationContext::new(store.clone())
}

#[tokio::test]
async fn items_renamed_first_then_actor_sums_them() {
    let rename = MigrationStep::builder(1.0, "old a new").item(|item, _| {
                                                             item.rename_path("old", "new")?;
                                                             Ok(())
                                                         })
                                                         .build()
                                                         .expect("paso 1");
    let sum = MigrationStep::builder(2.0, "total").actor(|actor| {
                                                      let total: i64 = actor.embedded_values()
                                                                            .iter()
                                                                            .filter_map(|i| i.get("new").and_then(|n| n.as_i64()))
                                                                            .sum();
                                                      actor.insert("total", json!(total));
                                                      Ok(())
                                                  })
                                                  .build()
                                                  .expect("paso 2");
    let registry = Arc::new(MigrationRegistry::from_steps(vec![sum, rename]).expect("registro"));

    let mut world = World::new("scenario-a", SchemaVersion::ZERO);
    let items = vec![json!({"_id": "i1", "old": 3}), json!({"_id": "i2", "old": 4})];
    world.insert(Document::from_value(DocumentKind::Actor, WorldStubs::actor("a1", "character", -1.0, items)).expect("actor"))
         .expect("insert");
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::default());

    let summary = runner.run(&mut world, &context(&store), RunOptions::new().with_target(Some(v(2.0))))
                        .await
                        .expect("corrida");

    let actor = world.get(DocumentKind::Actor, "a1").expect("actor");
    assert_eq!(actor.stamp(), v(2.0));
    assert_eq!(actor.source().get("total"), Some(&json!(7)));
    let items = actor.source().embedded_values();
    assert_eq!(items[0]["new"], json!(3));
    assert_eq!(items[1]["new"], json!(4));
    assert!(items[0].get("old").is_none());
    for item in items {
        assert_eq!(SchemaVersion::from_json(&item["schemaVersion"]).expect("stamp"), v(1.0));
    }

    assert!(summary.world_stamped);
    assert_eq!(summary.kind(DocumentKind::Actor).map(|k| k.migrated), Some(1));
    assert_eq!(summary.kind(DocumentKind::Item).map(|k| k.migrated), Some(2));
    let persisted = store.snapshot();
    assert_eq!(persisted.schema_version(), v(2.0));
    assert_eq!(persisted.get(DocumentKind::Actor, "a1"), world.get(DocumentKind::Actor, "a1"));
}

#[tokio::test]
async fn failing_document_freezes_while_siblings_finish() {
    let mut steps = Vec::new();
    for version in 1..=5 {
        let step = MigrationStep::builder(version as f64, format!("paso {}", version))
            .document(DocumentKind::JournalEntry, move |src| {
                if version == 2 && src.id() == Some("x") {
                    anyhow::bail!("contenido corrupto");
                }
                let mut seen = src.get("seen").and_then(|s| s.as_array()).cloned().unwrap_or_default();
                seen.push(json!(version));
                src.insert("seen", json!(seen));
                Ok(())
            })
            .build()
            .expect("paso");
        steps.push(step);
    }
    let registry = Arc::new(MigrationRegistry::from_steps(steps).expect("registro"));

    let mut world = World::new("scenario-b", SchemaVersion::ZERO);
    for id in ["a", "x", "b"] {
        world.insert(Document::from_value(DocumentKind::JournalEntry, json!({"_id": id})).expect("doc"))
             .expect("insert");
    }
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::default());
    let summary = runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");

    let x = world.get(DocumentKind::JournalEntry, "x").expect("x");
    assert_eq!(x.stamp(), v(1.0));
    assert_eq!(x.source().get("seen"), Some(&json!([1])));
    for id in ["a", "b"] {
        let doc = world.get(DocumentKind::JournalEntry, id).expect("doc");
        assert_eq!(doc.stamp(), v(5.0));
        assert_eq!(doc.source().get("seen"), Some(&json!([1, 2, 3, 4, 5])));
    }

    let journal = summary.kind(DocumentKind::JournalEntry).expect("resumen");
    assert_eq!((journal.migrated, journal.failed), (2, 1));
    assert_eq!(journal.failures.len(), 1);
    assert_eq!(journal.failures[0].document_id, "x");
    assert_eq!(journal.failures[0].version, Some(v(2.0)));
    let outcome = summary.outcome(DocumentKind::JournalEntry, "x").expect("desenlace");
    assert_eq!(outcome.status(), OutcomeStatus::Failed);
    assert_eq!(outcome.applied_versions, vec![v(1.0)]);
    assert_eq!(outcome.final_stamp, v(1.0));
    // fallos blandos no impiden estampar el mundo
    assert!(summary.world_stamped);
    assert_eq!(store.snapshot().get(DocumentKind::JournalEntry, "x").map(|d| d.stamp()), Some(v(1.0)));
}

#[tokio::test]
async fn steps_never_see_documents_at_or_above_their_version() {
    let violations = Arc::new(AtomicUsize::new(0));
    let mut steps = Vec::new();
    for version in [1.0, 2.0, 3.0] {
        let violations = violations.clone();
        steps.push(MigrationStep::builder(version, "guardia").document(DocumentKind::Macro, move |src| {
                                                                  if src.schema_version()? >= v(version) {
                                                                      violations.fetch_add(1, Ordering::SeqCst);
                                                                  }
                                                                  Ok(())
                                                              })
                                                              .build()
                                                              .expect("paso"));
    }
    let registry = Arc::new(MigrationRegistry::from_steps(steps).expect("registro"));
    let mut world = World::new("no-go-back", v(1.0));
    for (id, stamp) in [("m0", 0.0), ("m1", 1.0), ("m2", 2.5), ("m3", 3.0), ("m9", 9.0)] {
        world.insert(Document::from_value(DocumentKind::Macro, json!({"_id": id, "schemaVersion": stamp})).expect("doc"))
             .expect("insert");
    }
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::default());
    let summary = runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");

    assert_eq!(violations.load(Ordering::SeqCst), 0);
    // m0: 1,2,3 - m1: 2,3 - m2: 3
    assert_eq!(summary.handler_invocations, 6);
    let stamps: Vec<f64> = world.documents(DocumentKind::Macro).map(|d| d.stamp().value()).collect();
    assert_eq!(stamps, vec![3.0, 3.0, 3.0, 3.0, 9.0]);
    assert_eq!(summary.kind(DocumentKind::Macro).map(|k| (k.migrated, k.skipped)), Some((3, 2)));
}

#[tokio::test]
async fn item_handlers_observe_the_actor_mutated_at_the_same_version() {
    let step = MigrationStep::builder(1.0, "rango").actor(|actor| {
                                                       actor.set_path("system.rank", json!("veterano"))?;
                                                       Ok(())
                                                   })
                                                   .item(|item, parent| {
                                                       let rank = parent.and_then(|p| p.get_path("system.rank")).cloned();
                                                       item.insert("ownerRank", rank.unwrap_or(json!(null)));
                                                       Ok(())
                                                   })
                                                   .build()
                                                   .expect("paso");
    let registry = Arc::new(MigrationRegistry::from_steps(vec![step]).expect("registro"));
    let mut world = World::new("orden", SchemaVersion::ZERO);
    let items: Vec<_> = (0..20).map(|n| WorldStubs::item(&format!("i{}", n), -1.0, json!({}))).collect();
    world.insert(Document::from_value(DocumentKind::Actor, WorldStubs::actor("a1", "npc", -1.0, items)).expect("actor"))
         .expect("insert");
    world.insert(Document::from_value(DocumentKind::Item, WorldStubs::item("loose", -1.0, json!({}))).expect("item"))
         .expect("insert");
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::default());
    runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");

    let actor = world.get(DocumentKind::Actor, "a1").expect("actor");
    for item in actor.source().embedded_values() {
        assert_eq!(item["ownerRank"], json!("veterano"));
    }
    // un item suelto no tiene padre
    let loose = world.get(DocumentKind::Item, "loose").expect("item");
    assert_eq!(loose.source().get("ownerRank"), Some(&json!(null)));
    assert_eq!(loose.stamp(), v(1.0));
}

#[tokio::test]
async fn failure_in_one_kind_does_not_block_other_kinds() {
    let step = MigrationStep::builder(1.0, "mixto").document(DocumentKind::User, |_| anyhow::bail!("usuario roto"))
                                                  .document(DocumentKind::Macro, |src| {
                                                      src.insert("ok", json!(true));
                                                      Ok(())
                                                  })
                                                  .build()
                                                  .expect("paso");
    let registry = Arc::new(MigrationRegistry::from_steps(vec![step]).expect("registro"));
    let mut world = World::new("aislamiento", SchemaVersion::ZERO);
    world.insert(Document::from_value(DocumentKind::User, json!({"_id": "u1"})).expect("user")).expect("insert");
    world.insert(Document::from_value(DocumentKind::Macro, json!({"_id": "m1"})).expect("macro")).expect("insert");
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::sequential());
    let summary = runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");

    assert_eq!(summary.kind(DocumentKind::User).map(|k| k.failed), Some(1));
    assert_eq!(summary.kind(DocumentKind::Macro).map(|k| k.migrated), Some(1));
    assert_eq!(world.get(DocumentKind::User, "u1").map(|d| d.stamp()), Some(SchemaVersion::ZERO));
    assert_eq!(store.commit_count(), 1);
}

#[tokio::test]
async fn failed_actor_keeps_its_items_where_they_were() {
    let step_one = MigrationStep::builder(1.0, "actor falla").actor(|_| anyhow::bail!("sin nombre")).build().expect("paso");
    let step_two = MigrationStep::builder(2.0, "items").item(|item, _| {
                                                           item.insert("touched", json!(true));
                                                           Ok(())
                                                       })
                                                       .build()
                                                       .expect("paso");
    let registry = Arc::new(MigrationRegistry::from_steps(vec![step_one, step_two]).expect("registro"));
    let mut world = World::new("unidad", SchemaVersion::ZERO);
    let items = vec![WorldStubs::item("i1", -1.0, json!({}))];
    world.insert(Document::from_value(DocumentKind::Actor, WorldStubs::actor("a1", "npc", -1.0, items)).expect("actor"))
         .expect("insert");
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::default());
    let summary = runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");

    let actor = world.get(DocumentKind::Actor, "a1").expect("actor");
    assert!(actor.source().embedded_values()[0].get("touched").is_none());
    assert_eq!(summary.dirty_documents, 0);
    assert_eq!(store.commit_count(), 0);
    assert_eq!(summary.outcome(DocumentKind::Item, "i1").map(|o| o.status()), Some(OutcomeStatus::Skipped));
}

#[tokio::test]
async fn item_handlers_see_the_parent_with_all_its_items() {
    let count = MigrationStep::builder(1.0, "hermanos").item(|item, parent| {
                                                          let siblings = parent.map(|p| p.embedded_values().len()).unwrap_or(0);
                                                          let listed = parent.is_some_and(|p| p.embedded_values().iter().any(|i| i["_id"].as_str() == item.id()));
                                                          item.insert("siblingsSeen", json!(siblings));
                                                          item.insert("listedInParent", json!(listed));
                                                          Ok(())
                                                      })
                                                      .build()
                                                      .expect("paso");
    let registry = Arc::new(MigrationRegistry::from_steps(vec![count]).expect("registro"));
    let mut world = World::new("siblings", SchemaVersion::ZERO);
    let items = vec![WorldStubs::item("i1", -1.0, json!({})), WorldStubs::item("i2", -1.0, json!({}))];
    world.insert(Document::from_value(DocumentKind::Actor, WorldStubs::actor("a1", "character", -1.0, items)).expect("actor"))
         .expect("insert");
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let runner = MigrationRunner::new(registry, RunnerConfig::default());

    runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");

    let actor = world.get(DocumentKind::Actor, "a1").expect("actor");
    let seen: Vec<_> = actor.source().embedded_values().iter().map(|i| i["siblingsSeen"].clone()).collect();
    assert_eq!(seen, vec![json!(2), json!(2)]);
    for item in actor.source().embedded_values() {
        assert_eq!(item["listedInParent"], json!(true));
    }
}

#[tokio::test]
async fn every_document_gets_a_step_before_any_gets_the_next() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut steps = Vec::new();
    for version in [1.0, 2.0] {
        let log = calls.clone();
        let step = MigrationStep::builder(version, format!("v{}", version)).document(DocumentKind::Macro, move |src| {
                                                                               log.lock().unwrap_or_else(|e| e.into_inner()).push(version);
                                                                               src.insert("last", json!(version));
                                                                               Ok(())
                                                                           })
                                                                           .build()
                                                                           .expect("paso");
        steps.push(step);
    }
    let registry = Arc::new(MigrationRegistry::from_steps(steps).expect("registro"));
    let mut world = World::new("barrier", SchemaVersion::ZERO);
    for n in 0..250 {
        world.insert(Document::from_value(DocumentKind::Macro, json!({"_id": format!("m{}", n)})).expect("macro"))
             .expect("insert");
    }
    let store = Arc::new(InMemoryWorldStore::new(world.clone()));
    let config = RunnerConfig { parallel: true,
                                ..RunnerConfig::default() };
    let runner = MigrationRunner::new(registry, config);

    let summary = runner.run(&mut world, &context(&store), RunOptions::new()).await.expect("corrida");
    assert_eq!(summary.handler_invocations, 500);

    let calls = calls.lock().unwrap_or_else(|e| e.into_inner()).clone();
    assert_eq!(calls.len(), 500);
    let first_v2 = calls.iter().position(|v| *v == 2.0).expect("llamadas de v2");
    assert_eq!(first_v2, 250);
    assert!(calls[..first_v2].iter().all(|v| *v == 1.0));
    assert!(calls[first_v2..].iter().all(|v| *v == 2.0));
}
