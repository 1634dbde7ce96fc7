use log::info;
use migration::{DocumentDiff, MigrationService, MigrationSummary, ReportSink, RunnerConfig};
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use world_domain::{SchemaVersion, World};
use world_persistence::DieselWorldStore;

/// Sink que imprime los diffs del dry-run en la terminal.
struct ConsoleReportSink;

impl ReportSink for ConsoleReportSink {
    fn record_diff(&self, diff: &DocumentDiff) {
        println!("  {:<12} {:<24} {} -> {}", diff.kind, diff.document_id, diff.before_stamp, diff.after_stamp);
    }

    fn record_summary(&self, _summary: &MigrationSummary) {}
}

/// Pequeño menú interactivo para migrar el mundo guardado en SQLite
/// (`WORLD_DB_URL`, por defecto `world.sqlite3`).
///
/// Opciones soportadas:
/// 1) Ver estado del mundo
/// 2) Importar mundo desde un export JSON
/// 3) Dry run hasta la última versión
/// 4) Migrar hasta la última versión
/// 5) Migrar hasta una versión concreta
/// 6) Exportar mundo a JSON
/// 7) Salir
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Abre la base (aplica migraciones embebidas si procede)
    let store = Arc::new(world_persistence::new_from_env()?);
    let registry = world_migrations::shared_registry()?;
    info!("registro listo: {} pasos hasta la versión {}", registry.len(), registry.latest_version());
    let service = MigrationService::new(store.clone(), registry, RunnerConfig::from_env()).with_report_sink(Arc::new(ConsoleReportSink));

    loop {
        println!("\n== World migrate ==");
        println!("1) Ver estado del mundo");
        println!("2) Importar mundo (export JSON)");
        println!("3) Dry run hasta la última versión");
        println!("4) Migrar hasta la última versión");
        println!("5) Migrar hasta una versión concreta");
        println!("6) Exportar mundo a JSON");
        println!("7) Salir");
        let choice = prompt("Elige una opción: ")?;
        match choice.trim() {
            "1" => match service.status().await {
                Ok(status) => {
                    println!("\nMundo {} en versión {} (última registrada {})",
                             status.world_id, status.world_version, status.latest_version);
                    println!("TIPO         | TOTAL | PENDIENTES");
                    println!("-------------------------------");
                    for (kind, k) in &status.kinds {
                        println!("{:<12} | {:>5} | {:>10}", kind, k.total, k.outdated);
                    }
                    if status.is_current() {
                        println!("El mundo está al día");
                    }
                }
                Err(e) => eprintln!("Error leyendo el estado: {}", e),
            },
            "2" => {
                let path = prompt("Ruta del export JSON: ")?;
                if let Err(e) = import(&store, path.trim()) {
                    eprintln!("Error importando: {}", e);
                }
            }
            "3" => {
                println!("Cambios previstos:");
                match service.migrate(None, true).await {
                    Ok(summary) => print_summary(&summary),
                    Err(e) => eprintln!("Error en el dry run: {}", e),
                }
            }
            "4" => match service.migrate(None, false).await {
                Ok(summary) => print_summary(&summary),
                Err(e) => eprintln!("Error migrando: {}", e),
            },
            "5" => {
                let raw = prompt("Versión objetivo (ej: 0.3): ")?;
                let target = match raw.trim().parse::<f64>().ok().and_then(|v| SchemaVersion::new(v).ok()) {
                    Some(v) => v,
                    None => {
                        eprintln!("Versión inválida");
                        continue;
                    }
                };
                match service.migrate(Some(target), false).await {
                    Ok(summary) => print_summary(&summary),
                    Err(e) => eprintln!("Error migrando: {}", e),
                }
            }
            "6" => {
                let path = prompt("Ruta de salida: ")?;
                match store.load().and_then(|w| Ok(w.to_json_pretty()?)) {
                    Ok(json) => match std::fs::write(path.trim(), json) {
                        Ok(()) => println!("Mundo exportado a {}", path.trim()),
                        Err(e) => eprintln!("Error escribiendo: {}", e),
                    },
                    Err(e) => eprintln!("Error exportando: {}", e),
                }
            }
            "7" => {
                println!("Saliendo...");
                break;
            }
            other => {
                println!("Opción inválida: {}", other);
            }
        }
    }

    Ok(())
}

fn import(store: &DieselWorldStore, path: &str) -> Result<(), Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)?;
    let world = World::from_json_str(&raw)?;
    let written = store.import_world(&world)?;
    println!("Importados {} documentos del mundo {}", written, world.id());
    Ok(())
}

fn print_summary(summary: &MigrationSummary) {
    println!("\nCorrida {} ({} -> {}){}",
             summary.run_id,
             summary.from_version,
             summary.target_version,
             if summary.dry_run { " [dry-run]" } else { "" });
    println!("TIPO         | MIGRADOS | OMITIDOS | FALLIDOS | ESCRITURA");
    println!("--------------------------------------------------------");
    for (kind, k) in &summary.kinds {
        println!("{:<12} | {:>8} | {:>8} | {:>8} | {:>9}", kind, k.migrated, k.skipped, k.failed, k.persist_failures.len());
        for f in k.failures.iter().chain(k.persist_failures.iter()) {
            println!("    {}: {}", f.document_id, f.message);
        }
    }
    if let Some(err) = &summary.world_stamp_error {
        println!("No se pudo estampar el mundo: {}", err.message);
    }
    if summary.cancelled {
        println!("Corrida cancelada");
    }
    println!("Documentos escritos: {}, mundo estampado: {}", summary.committed, summary.world_stamped);
}

fn prompt(msg: &str) -> io::Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(s)
}
