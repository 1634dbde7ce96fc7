// Archivo: persister.rs
// Propósito: contratos con el exterior del motor: carga del corpus,
// escritura de documentos migrados y destino de reportes (dry-run).
use crate::domain::{DocumentDiff, MigrationSummary};
use crate::errors::{PersistError, Result};
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use world_domain::{DocumentKind, DocumentSource, SchemaVersion, World};

/// Entrega un mundo completo en memoria.
#[async_trait]
pub trait CorpusLoader: Send + Sync {
    async fn load_world(&self) -> Result<World>;
}

/// Escribe los documentos migrados. Las implementaciones deben ser
/// idempotentes: reescribir la misma fuente no cambia el resultado.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Escribe la fuente completa de un documento de nivel superior (los
    /// items embebidos viajan dentro de la fuente del actor).
    async fn commit(&self, kind: DocumentKind, document_id: &str, source: &DocumentSource) -> std::result::Result<(), PersistError>;

    /// Estampa la versión alcanzada en los ajustes del mundo.
    async fn stamp_world_version(&self, version: SchemaVersion) -> std::result::Result<(), PersistError>;
}

/// Destino de diffs y resúmenes.
pub trait ReportSink: Send + Sync {
    fn record_diff(&self, diff: &DocumentDiff);
    fn record_summary(&self, summary: &MigrationSummary);
}

/// Sink por defecto: vuelca todo al log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn record_diff(&self, diff: &DocumentDiff) {
        info!("[dry-run] {} {}: {} -> {} ({} -> {})",
              diff.kind,
              diff.document_id,
              diff.before_stamp,
              diff.after_stamp,
              short(&diff.before_checksum),
              short(&diff.after_checksum));
    }

    fn record_summary(&self, summary: &MigrationSummary) {
        info!("corrida {} sobre {}: {} migrados, {} omitidos, {} fallidos, {} fallos de escritura (dry_run={}, estampado={})",
              summary.run_id,
              summary.world_id,
              summary.total_migrated(),
              summary.total_skipped(),
              summary.total_failed(),
              summary.persist_failure_count(),
              summary.dry_run,
              summary.world_stamped);
    }
}

fn short(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Dependencias externas que recibe una corrida.
#[derive(Clone)]
pub struct MigrationContext {
    pub persister: Arc<dyn Persister>,
    pub report_sink: Arc<dyn ReportSink>,
}

impl MigrationContext {
    pub fn new(persister: Arc<dyn Persister>) -> Self {
        Self { persister,
               report_sink: Arc::new(LogReportSink) }
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = sink;
        self
    }
}
