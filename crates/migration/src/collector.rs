// Archivo: collector.rs
// Propósito: acumular desenlaces y fallos de una corrida y clasificarlos
// en duros (detienen la corrida antes de empezar) o blandos (van al
// resumen).
use crate::domain::{FailureRecord, KindSummary, MigrationOutcome};
use crate::errors::{MigrationError, PersistError, Severity};
use dashmap::DashMap;
use indexmap::IndexMap;
use log::{error, warn};
use std::sync::Mutex;
use world_domain::DocumentKind;

#[derive(Debug, Default)]
pub struct FailureCollector {
    outcomes: DashMap<DocumentKind, Vec<MigrationOutcome>>,
    persist_failures: DashMap<DocumentKind, Vec<PersistError>>,
    world_failures: Mutex<Vec<PersistError>>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify(error: &MigrationError) -> Severity {
        error.severity()
    }

    pub fn record(&self, outcome: MigrationOutcome) {
        self.outcomes.entry(outcome.kind).or_default().push(outcome);
    }

    /// Registra un error arbitrario y devuelve su severidad.
    ///
    /// Los errores duros sólo se registran en el log: cortan la corrida con
    /// `?` antes de tocar documentos, así que nunca llegan a un resumen.
    pub fn record_error(&self, err: &MigrationError) -> Severity {
        let severity = Self::classify(err);
        match (severity, err) {
            (Severity::Soft, MigrationError::Persist(p)) => self.record_persist_failure(p.clone()),
            (Severity::Soft, other) => warn!("fallo por documento: {}", other),
            (Severity::Hard, other) => error!("fallo duro: {}", other),
        }
        severity
    }

    pub fn record_persist_failure(&self, err: PersistError) {
        warn!("{}", err);
        match err.kind {
            Some(kind) => self.persist_failures.entry(kind).or_default().push(err),
            None => self.world_failures.lock().unwrap_or_else(|e| e.into_inner()).push(err),
        }
    }

    /// Fallos blandos registrados hasta ahora.
    pub fn soft_failure_count(&self) -> usize {
        let transform: usize = self.outcomes
                                   .iter()
                                   .map(|e| e.value().iter().filter(|o| o.last_error.is_some()).count())
                                   .sum();
        let persist: usize = self.persist_failures.iter().map(|e| e.value().len()).sum();
        transform + persist + self.world_failures.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Consume el colector y arma los resúmenes por tipo en el orden de
    /// migración, junto con la lista plana de desenlaces.
    pub fn into_parts(self) -> (IndexMap<DocumentKind, KindSummary>, Vec<MigrationOutcome>) {
        let mut kinds = IndexMap::new();
        let mut all = Vec::new();
        for kind in DocumentKind::MIGRATION_ORDER {
            let outcomes = self.outcomes.remove(&kind).map(|(_, v)| v).unwrap_or_default();
            let persist = self.persist_failures.remove(&kind).map(|(_, v)| v).unwrap_or_default();
            if outcomes.is_empty() && persist.is_empty() {
                continue;
            }
            let mut summary = KindSummary::default();
            for outcome in &outcomes {
                summary.count(outcome);
            }
            summary.persist_failures = persist.iter().map(FailureRecord::from).collect();
            kinds.insert(kind, summary);
            all.extend(outcomes);
        }
        (kinds, all)
    }
}
