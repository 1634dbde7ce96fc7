// Archivo: runner.rs
// Propósito: orquestar una corrida completa sobre un mundo.
//
// Orden de trabajo: tipos en `DocumentKind::MIGRATION_ORDER`; dentro de un
// tipo, pasos en versión ascendente; cada paso se aplica a todos los
// documentos del tipo (en paralelo) antes de pasar al siguiente. Al final
// se escriben los documentos con cambios y, si nada grave ocurrió, se
// estampa la versión del mundo.
use crate::collector::FailureCollector;
use crate::config::{RunOptions, RunnerConfig};
use crate::domain::{DocumentDiff, MigrationSummary};
use crate::errors::{MigrationError, PersistError, Result};
use crate::persister::MigrationContext;
use crate::registry::MigrationRegistry;
use crate::step::MigrationStep;
use crate::updater::{DocumentUpdater, StepApplication, WorkingDocument};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{error, info, warn};
use rayon::prelude::*;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use world_domain::{DocumentKind, SchemaVersion, World};

/// Motor de migración. Un mismo runner puede atender varios mundos, pero
/// nunca dos corridas a la vez sobre el mismo mundo.
pub struct MigrationRunner {
    registry: Arc<MigrationRegistry>,
    updater: DocumentUpdater,
    config: RunnerConfig,
    /// world_id -> run_id de la corrida activa.
    active_runs: DashMap<String, Uuid>,
}

/// Libera el lock del mundo al terminar la corrida, incluso ante error.
struct RunGuard<'a> {
    runs: &'a DashMap<String, Uuid>,
    world_id: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs.remove(&self.world_id);
    }
}

impl MigrationRunner {
    pub fn new(registry: Arc<MigrationRegistry>, config: RunnerConfig) -> Self {
        Self { registry,
               updater: DocumentUpdater::new(),
               config,
               active_runs: DashMap::new() }
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn is_running(&self, world_id: &str) -> bool {
        self.active_runs.contains_key(world_id)
    }

    fn acquire(&self, world_id: &str, run_id: Uuid) -> Result<RunGuard<'_>> {
        match self.active_runs.entry(world_id.to_string()) {
            Entry::Occupied(_) => Err(MigrationError::RunInProgress(world_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(run_id);
                Ok(RunGuard { runs: &self.active_runs,
                              world_id: world_id.to_string() })
            }
        }
    }

    /// Sin objetivo explícito se migra hasta la última versión registrada.
    fn resolve_target(&self, requested: Option<SchemaVersion>) -> Result<SchemaVersion> {
        let latest = self.registry.latest_version();
        match requested {
            None => Ok(latest),
            Some(target) if target > latest => {
                Err(MigrationError::InvalidTarget(format!("{} supera la última versión registrada ({})", target, latest)))
            }
            Some(target) => Ok(target),
        }
    }

    /// Ejecuta una corrida sobre `world`, que queda con las fuentes
    /// migradas en memoria (también en dry-run).
    ///
    /// Errores duros (`InvalidTarget`, `RunInProgress`) se devuelven antes
    /// de tocar documento alguno. Los fallos por documento van al resumen.
    pub async fn run(&self, world: &mut World, ctx: &MigrationContext, options: RunOptions) -> Result<MigrationSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let target = self.resolve_target(options.target).inspect_err(|e| error!("{}", e))?;
        let _guard = self.acquire(world.id(), run_id).inspect_err(|e| error!("{}", e))?;
        let from_version = world.schema_version();
        info!("corrida {} sobre {}: {} -> {} (dry_run={})",
              run_id,
              world.id(),
              from_version,
              target,
              options.dry_run);

        let collector = FailureCollector::new();
        let mut invocations = 0usize;
        let mut cancelled = false;
        let mut processed: Vec<(DocumentKind, Vec<WorkingDocument>)> = Vec::new();

        for kind in DocumentKind::MIGRATION_ORDER {
            if cancelled {
                break;
            }
            let docs = world.take_documents(kind);
            if docs.is_empty() {
                continue;
            }
            let mut working: Vec<WorkingDocument> = if options.dry_run {
                docs.into_iter().map(WorkingDocument::tracked).collect()
            } else {
                docs.into_iter().map(WorkingDocument::new).collect()
            };
            let floor = working.iter().map(|w| w.document.min_stamp()).min().unwrap_or(SchemaVersion::ZERO);
            for step in self.registry.unit_steps(floor, target, kind) {
                if options.cancel.is_cancelled() {
                    info!("corrida {} cancelada antes de {} ({})", run_id, step.version(), kind);
                    cancelled = true;
                    break;
                }
                let applied = self.apply_step(step, &mut working);
                info!("{} `{}` sobre {}: {} invocaciones, {} aplicados, {} fallidos",
                       step.version(),
                       step.label(),
                       kind,
                       applied.invocations,
                       applied.applied,
                       applied.failed);
                invocations += applied.invocations;
            }
            for w in &working {
                for outcome in w.outcomes() {
                    collector.record(outcome);
                }
            }
            processed.push((kind, working));
        }

        let mut dirty_documents = 0usize;
        let mut committed = 0usize;
        for (kind, working) in &processed {
            for w in working.iter().filter(|w| w.is_dirty()) {
                dirty_documents += 1;
                if options.dry_run {
                    ctx.report_sink.record_diff(&diff_of(*kind, w));
                    continue;
                }
                let source = w.document.source();
                let id = w.document.id();
                match self.with_retry(move || ctx.persister.commit(*kind, id, source)).await {
                    Ok(()) => committed += 1,
                    Err(e) => collector.record_persist_failure(e),
                }
            }
        }
        for (kind, working) in processed {
            world.restore_documents(kind, working.into_iter().map(|w| w.document).collect());
        }

        let mut world_stamped = false;
        let mut world_stamp_error = None;
        // los errores duros ya cortaron la corrida con `?` antes de este punto
        if !options.dry_run && !cancelled && target > world.schema_version() {
            match self.with_retry(move || ctx.persister.stamp_world_version(target)).await {
                Ok(()) => {
                    world.set_schema_version(target);
                    world_stamped = true;
                }
                Err(e) => {
                    collector.record_persist_failure(e.clone());
                    world_stamp_error = Some(e);
                }
            }
        }

        let (kinds, outcomes) = collector.into_parts();
        let summary = MigrationSummary { run_id,
                                         world_id: world.id().to_string(),
                                         from_version,
                                         target_version: target,
                                         dry_run: options.dry_run,
                                         cancelled,
                                         world_stamped,
                                         handler_invocations: invocations,
                                         dirty_documents,
                                         committed,
                                         kinds,
                                         outcomes,
                                         world_stamp_error,
                                         started_at,
                                         finished_at: Utc::now() };
        ctx.report_sink.record_summary(&summary);
        Ok(summary)
    }

    /// Barrera de un paso: todos los documentos del tipo reciben el paso
    /// antes de que la corrida avance al siguiente.
    fn apply_step(&self, step: &MigrationStep, working: &mut [WorkingDocument]) -> StepApplication {
        if self.config.parallel {
            working.par_iter_mut()
                   .map(|w| self.updater.apply(step, w))
                   .reduce(StepApplication::default, StepApplication::merge)
        } else {
            working.iter_mut()
                   .map(|w| self.updater.apply(step, w))
                   .fold(StepApplication::default(), StepApplication::merge)
        }
    }

    /// Un único reintento tras `persist_retry_backoff`.
    async fn with_retry<F, Fut>(&self, mut op: F) -> std::result::Result<(), PersistError>
        where F: FnMut() -> Fut,
              Fut: Future<Output = std::result::Result<(), PersistError>>
    {
        match op().await {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!("{}; reintentando", first);
                tokio::time::sleep(self.config.persist_retry_backoff).await;
                op().await.map_err(|mut e| {
                              e.attempts = 2;
                              e
                          })
            }
        }
    }
}

fn diff_of(kind: DocumentKind, working: &WorkingDocument) -> DocumentDiff {
    let source = working.document.source();
    let before_checksum = working.original_checksum.clone().unwrap_or_default();
    DocumentDiff { kind,
                   document_id: working.document.id().to_string(),
                   before_stamp: working.progress.initial_stamp,
                   after_stamp: working.document.stamp(),
                   before_checksum,
                   after_checksum: source.checksum().unwrap_or_default(),
                   source: source.clone() }
}
