// Archivo: stubs.rs
// Propósito: implementaciones en memoria para pruebas y demos.
//
// `InMemoryWorldStore` carga y persiste un `World` en memoria y permite
// inyectar fallos de escritura; `RecordingReportSink` guarda diffs y
// resúmenes. No son durables.
use crate::domain::{DocumentDiff, MigrationSummary};
use crate::errors::{PersistError, Result};
use crate::persister::{CorpusLoader, Persister, ReportSink};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use world_domain::{Document, DocumentKind, DocumentSource, SchemaVersion, World};

/// Clave de inyección de fallos para el estampado del mundo.
pub const WORLD_STAMP_KEY: &str = "@world";

pub struct InMemoryWorldStore {
    world: Mutex<World>,
    /// document_id (o `WORLD_STAMP_KEY`) -> fallos pendientes.
    failures: Mutex<HashMap<String, u32>>,
    commits: AtomicUsize,
    stamp_calls: AtomicUsize,
    commit_delay: Option<Duration>,
}

impl InMemoryWorldStore {
    pub fn new(world: World) -> Self {
        Self { world: Mutex::new(world),
               failures: Mutex::new(HashMap::new()),
               commits: AtomicUsize::new(0),
               stamp_calls: AtomicUsize::new(0),
               commit_delay: None }
    }

    /// Cada escritura espera `delay` antes de aplicarse.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = Some(delay);
        self
    }

    /// Las próximas `times` escrituras de `document_id` fallan.
    pub fn fail_next(&self, document_id: &str, times: u32) {
        lock(&self.failures).insert(document_id.to_string(), times);
    }

    /// Copia del mundo tal como está almacenado.
    pub fn snapshot(&self) -> World {
        lock(&self.world).clone()
    }

    /// Escrituras exitosas de documentos.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn stamp_calls(&self) -> usize {
        self.stamp_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, key: &str) -> bool {
        let mut failures = lock(&self.failures);
        match failures.get_mut(key) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl CorpusLoader for InMemoryWorldStore {
    async fn load_world(&self) -> Result<World> {
        Ok(self.snapshot())
    }
}

#[async_trait]
impl Persister for InMemoryWorldStore {
    async fn commit(&self, kind: DocumentKind, document_id: &str, source: &DocumentSource) -> std::result::Result<(), PersistError> {
        if let Some(delay) = self.commit_delay {
            tokio::time::sleep(delay).await;
        }
        if self.injected_failure(document_id) {
            return Err(PersistError::new(Some(kind), document_id, "fallo de escritura inyectado"));
        }
        let doc = Document::new(kind, source.clone()).map_err(|e| PersistError::new(Some(kind), document_id, e.to_string()))?;
        lock(&self.world).upsert(doc);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stamp_world_version(&self, version: SchemaVersion) -> std::result::Result<(), PersistError> {
        self.stamp_calls.fetch_add(1, Ordering::SeqCst);
        let mut world = lock(&self.world);
        if self.injected_failure(WORLD_STAMP_KEY) {
            return Err(PersistError::new(None, world.id(), "fallo de estampado inyectado"));
        }
        world.set_schema_version(version);
        Ok(())
    }
}

/// Sink que guarda todo lo recibido para inspeccionarlo después.
#[derive(Default)]
pub struct RecordingReportSink {
    diffs: Mutex<Vec<DocumentDiff>>,
    summaries: Mutex<Vec<MigrationSummary>>,
}

impl RecordingReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diffs(&self) -> Vec<DocumentDiff> {
        lock(&self.diffs).clone()
    }

    pub fn summaries(&self) -> Vec<MigrationSummary> {
        lock(&self.summaries).clone()
    }
}

impl ReportSink for RecordingReportSink {
    fn record_diff(&self, diff: &DocumentDiff) {
        lock(&self.diffs).push(diff.clone());
    }

    fn record_summary(&self, summary: &MigrationSummary) {
        lock(&self.summaries).push(summary.clone());
    }
}
