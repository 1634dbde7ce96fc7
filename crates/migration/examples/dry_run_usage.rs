use migration::stubs::{InMemoryWorldStore, RecordingReportSink};
use migration::{MigrationError, MigrationRegistry, MigrationService, MigrationStep, RunnerConfig};
use serde_json::json;
use std::sync::Arc;
use world_domain::{Document, DocumentKind, SchemaVersion, World, WorldStubs};

fn main() -> Result<(), MigrationError> {
    // Mundo con un actor y dos items embebidos sin migrar
    let mut world = World::new("demo", SchemaVersion::ZERO);
    let items = vec![WorldStubs::item("sword", -1.0, json!({"qty": 1})), WorldStubs::item("rope", -1.0, json!({"qty": 2}))];
    world.insert(Document::from_value(DocumentKind::Actor, WorldStubs::actor("hero", "character", -1.0, items))?)?;

    // Dos pasos: renombrar la cantidad de items y contar items en el actor
    let rename = MigrationStep::builder(1.0, "qty -> quantity").item(|item, _| {
                                                                  item.rename_path("system.qty", "system.quantity")?;
                                                                  Ok(())
                                                              })
                                                              .build()?;
    let count = MigrationStep::builder(2.0, "itemCount").actor(|actor| {
                                                           let n = actor.embedded_values().len();
                                                           actor.set_path("system.itemCount", json!(n))?;
                                                           Ok(())
                                                       })
                                                       .build()?;
    let registry = Arc::new(MigrationRegistry::from_steps(vec![rename, count])?);

    let store = Arc::new(InMemoryWorldStore::new(world));
    let sink = Arc::new(RecordingReportSink::new());
    let service = MigrationService::new(store.clone(), registry, RunnerConfig::default()).with_report_sink(sink.clone());

    // Primero en seco: nada se escribe
    let preview = tokio_test::block_on(service.migrate(None, true))?;
    println!("dry-run: {} migrados, {} diffs, {} escrituras", preview.total_migrated(), sink.diffs().len(), store.commit_count());
    for diff in sink.diffs() {
        println!("  {} {}: {} -> {}", diff.kind, diff.document_id, diff.before_stamp, diff.after_stamp);
    }

    // Corrida real y luego una segunda que no hace nada
    let summary = tokio_test::block_on(service.migrate(None, false))?;
    println!("real: {} escrituras, mundo estampado = {}", summary.committed, summary.world_stamped);
    let again = tokio_test::block_on(service.migrate(None, false))?;
    println!("segunda corrida: {} invocaciones", again.handler_invocations);

    let stored = store.snapshot();
    if let Some(hero) = stored.get(DocumentKind::Actor, "hero") {
        println!("{}", serde_json::to_string_pretty(hero.source()).unwrap_or_default());
    }
    Ok(())
}
