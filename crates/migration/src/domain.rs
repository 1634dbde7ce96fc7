// Archivo: domain.rs
// Propósito: tipos de resultado de una corrida: desenlace por documento,
// resumen por tipo, resumen global y diffs para el modo dry-run.
use crate::errors::{PersistError, TransformError};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use world_domain::{DocumentKind, DocumentSource, SchemaVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeStatus {
    Migrated,
    Skipped,
    Failed,
}

/// Desenlace de un documento (o item embebido) en una corrida.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub document_id: String,
    pub kind: DocumentKind,
    /// Actor dueño cuando el documento es un item embebido.
    pub parent_id: Option<String>,
    pub applied_versions: Vec<SchemaVersion>,
    pub final_stamp: SchemaVersion,
    pub last_error: Option<TransformError>,
}

impl MigrationOutcome {
    /// `failed` si hubo error (aunque antes se aplicaran versiones),
    /// `migrated` si se aplicó al menos una, `skipped` en otro caso.
    pub fn status(&self) -> OutcomeStatus {
        if self.last_error.is_some() {
            OutcomeStatus::Failed
        } else if !self.applied_versions.is_empty() {
            OutcomeStatus::Migrated
        } else {
            OutcomeStatus::Skipped
        }
    }
}

/// Entrada del resumen para un documento que falló.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub document_id: String,
    pub parent_id: Option<String>,
    pub version: Option<SchemaVersion>,
    pub message: String,
}

impl FailureRecord {
    pub fn from_outcome(outcome: &MigrationOutcome) -> Option<Self> {
        outcome.last_error.as_ref().map(|e| Self { document_id: outcome.document_id.clone(),
                                                   parent_id: outcome.parent_id.clone(),
                                                   version: Some(e.version),
                                                   message: e.cause.clone() })
    }
}

impl From<&PersistError> for FailureRecord {
    fn from(error: &PersistError) -> Self {
        Self { document_id: error.document_id.clone(),
               parent_id: None,
               version: None,
               message: error.message.clone() }
    }
}

/// Conteos de un tipo de documento.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindSummary {
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FailureRecord>,
    /// Fallos de escritura; no alteran los conteos anteriores.
    pub persist_failures: Vec<FailureRecord>,
}

impl KindSummary {
    pub fn total(&self) -> usize {
        self.migrated + self.skipped + self.failed
    }

    pub(crate) fn count(&mut self, outcome: &MigrationOutcome) {
        match outcome.status() {
            OutcomeStatus::Migrated => self.migrated += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
        if let Some(record) = FailureRecord::from_outcome(outcome) {
            self.failures.push(record);
        }
    }
}

/// Resumen de una corrida completa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub run_id: Uuid,
    pub world_id: String,
    pub from_version: SchemaVersion,
    pub target_version: SchemaVersion,
    pub dry_run: bool,
    pub cancelled: bool,
    pub world_stamped: bool,
    /// Invocaciones de handlers en toda la corrida.
    pub handler_invocations: usize,
    /// Documentos de nivel superior con cambios.
    pub dirty_documents: usize,
    /// Documentos escritos con éxito (siempre cero en dry-run).
    pub committed: usize,
    pub kinds: IndexMap<DocumentKind, KindSummary>,
    pub outcomes: Vec<MigrationOutcome>,
    pub world_stamp_error: Option<PersistError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MigrationSummary {
    pub fn kind(&self, kind: DocumentKind) -> Option<&KindSummary> {
        self.kinds.get(&kind)
    }

    pub fn outcome(&self, kind: DocumentKind, document_id: &str) -> Option<&MigrationOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind && o.document_id == document_id)
    }

    pub fn total_migrated(&self) -> usize {
        self.kinds.values().map(|k| k.migrated).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.kinds.values().map(|k| k.failed).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.kinds.values().map(|k| k.skipped).sum()
    }

    pub fn persist_failure_count(&self) -> usize {
        self.kinds.values().map(|k| k.persist_failures.len()).sum::<usize>() + usize::from(self.world_stamp_error.is_some())
    }

    pub fn has_failures(&self) -> bool {
        self.total_failed() > 0 || self.persist_failure_count() > 0
    }

    /// Parte comparable entre una corrida dry-run y una real sobre el mismo
    /// corpus: desenlaces y conteos, sin ids de corrida ni tiempos.
    pub fn same_outcomes(&self, other: &MigrationSummary) -> bool {
        self.kinds.iter()
                  .zip(other.kinds.iter())
                  .all(|((ka, a), (kb, b))| ka == kb && a.migrated == b.migrated && a.skipped == b.skipped && a.failed == b.failed && a.failures == b.failures)
        && self.kinds.len() == other.kinds.len()
        && self.outcomes == other.outcomes
        && self.handler_invocations == other.handler_invocations
        && self.dirty_documents == other.dirty_documents
    }
}

/// Cambio que una corrida dry-run habría escrito.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDiff {
    pub kind: DocumentKind,
    pub document_id: String,
    pub before_stamp: SchemaVersion,
    pub after_stamp: SchemaVersion,
    pub before_checksum: String,
    pub after_checksum: String,
    pub source: DocumentSource,
}
