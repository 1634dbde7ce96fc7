// Archivo: service.rs
// Propósito: `MigrationService`, el punto de entrada único: carga el mundo
// desde el almacenamiento, corre el runner y devuelve el resumen.
use crate::config::{RunOptions, RunnerConfig};
use crate::domain::MigrationSummary;
use crate::errors::Result;
use crate::persister::{CorpusLoader, LogReportSink, MigrationContext, Persister, ReportSink};
use crate::registry::MigrationRegistry;
use crate::runner::MigrationRunner;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use world_domain::{Document, DocumentKind, SchemaVersion, World};

/// Cuántos documentos de un tipo tienen pasos pendientes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindStatus {
    pub total: usize,
    pub outdated: usize,
}

/// Estado de un mundo respecto al registro.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStatus {
    pub world_id: String,
    pub world_version: SchemaVersion,
    pub latest_version: SchemaVersion,
    pub kinds: IndexMap<DocumentKind, KindStatus>,
}

impl WorldStatus {
    pub fn outdated(&self) -> usize {
        self.kinds.values().map(|k| k.outdated).sum()
    }

    pub fn is_current(&self) -> bool {
        self.outdated() == 0 && self.world_version >= self.latest_version
    }
}

/// Servicio de alto nivel sobre un almacenamiento que sabe cargar el
/// mundo y escribir documentos.
pub struct MigrationService<S> where S: CorpusLoader + Persister
{
    store: Arc<S>,
    runner: Arc<MigrationRunner>,
    report_sink: Arc<dyn ReportSink>,
}

impl<S> MigrationService<S> where S: CorpusLoader + Persister + 'static
{
    pub fn new(store: Arc<S>, registry: Arc<MigrationRegistry>, config: RunnerConfig) -> Self {
        Self { store,
               runner: Arc::new(MigrationRunner::new(registry, config)),
               report_sink: Arc::new(LogReportSink) }
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = sink;
        self
    }

    pub fn runner(&self) -> &Arc<MigrationRunner> {
        &self.runner
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn context(&self) -> MigrationContext {
        let persister: Arc<dyn Persister> = self.store.clone();
        MigrationContext::new(persister).with_report_sink(self.report_sink.clone())
    }

    /// Migra el mundo almacenado hasta `target` (o la última versión).
    pub async fn migrate(&self, target: Option<SchemaVersion>, dry_run: bool) -> Result<MigrationSummary> {
        self.migrate_with(RunOptions::new().with_target(target).dry_run(dry_run)).await
    }

    /// Igual que `migrate` con opciones completas (p. ej. cancelación).
    pub async fn migrate_with(&self, options: RunOptions) -> Result<MigrationSummary> {
        let mut world = self.store.load_world().await?;
        self.runner.run(&mut world, &self.context(), options).await
    }

    /// Migra un mundo ya cargado; los cambios se escriben en el store.
    pub async fn migrate_world(&self, world: &mut World, target: Option<SchemaVersion>, dry_run: bool) -> Result<MigrationSummary> {
        let options = RunOptions::new().with_target(target).dry_run(dry_run);
        self.runner.run(world, &self.context(), options).await
    }

    /// Documentos con pasos pendientes hasta la última versión registrada.
    pub async fn status(&self) -> Result<WorldStatus> {
        let world = self.store.load_world().await?;
        Ok(status_of(&world, self.runner.registry()))
    }
}

pub fn status_of(world: &World, registry: &MigrationRegistry) -> WorldStatus {
    let latest = registry.latest_version();
    let mut kinds = IndexMap::new();
    for kind in DocumentKind::MIGRATION_ORDER {
        let total = world.count(kind);
        if total == 0 {
            continue;
        }
        let outdated = world.documents(kind).filter(|d| is_outdated(d, registry, latest)).count();
        kinds.insert(kind, KindStatus { total, outdated });
    }
    WorldStatus { world_id: world.id().to_string(),
                  world_version: world.schema_version(),
                  latest_version: latest,
                  kinds }
}

/// Pendiente si queda un paso propio por encima de su estampado o, para
/// actores, un paso de items por encima del estampado de algún item.
fn is_outdated(doc: &Document, registry: &MigrationRegistry, latest: SchemaVersion) -> bool {
    if !registry.steps_between(doc.stamp(), latest, doc.kind()).is_empty() {
        return true;
    }
    doc.kind().embeds_items()
    && doc.embedded_stamps()
          .into_iter()
          .any(|stamp| !registry.steps_between(stamp, latest, DocumentKind::Item).is_empty())
}
