// Archivo: updater.rs
// Propósito: aplicar un único paso a un documento de trabajo. Un actor y
// sus items embebidos se tratan como una unidad: primero el actor, luego
// cada item con el actor como padre.
use crate::domain::MigrationOutcome;
use crate::errors::TransformError;
use crate::step::{MigrationStep, TransformFn};
use indexmap::IndexMap;
use log::{debug, warn};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use world_domain::{Document, DocumentKind, DocumentSource, SchemaVersion};

/// Progreso en memoria de un documento durante una corrida.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentProgress {
    pub document_id: String,
    pub kind: DocumentKind,
    pub parent_id: Option<String>,
    pub initial_stamp: SchemaVersion,
    pub applied_versions: Vec<SchemaVersion>,
    pub error: Option<TransformError>,
}

impl DocumentProgress {
    fn new(document_id: String, kind: DocumentKind, parent_id: Option<String>, initial_stamp: SchemaVersion) -> Self {
        Self { document_id,
               kind,
               parent_id,
               initial_stamp,
               applied_versions: Vec::new(),
               error: None }
    }

    /// Un documento que falló no recibe más pasos en la corrida.
    pub fn is_frozen(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        !self.applied_versions.is_empty()
    }

    pub fn current_stamp(&self) -> SchemaVersion {
        self.applied_versions.last().copied().unwrap_or(self.initial_stamp)
    }

    fn to_outcome(&self) -> MigrationOutcome {
        MigrationOutcome { document_id: self.document_id.clone(),
                           kind: self.kind,
                           parent_id: self.parent_id.clone(),
                           applied_versions: self.applied_versions.clone(),
                           final_stamp: self.current_stamp(),
                           last_error: self.error.clone() }
    }
}

/// Documento de nivel superior en proceso junto con el progreso de sus
/// items embebidos (indexados por `_id`).
#[derive(Debug, Clone)]
pub struct WorkingDocument {
    pub document: Document,
    pub progress: DocumentProgress,
    pub items: IndexMap<String, DocumentProgress>,
    /// Checksum previo a la corrida; sólo se calcula si hace falta un diff.
    pub original_checksum: Option<String>,
}

impl WorkingDocument {
    pub fn new(document: Document) -> Self {
        let progress = DocumentProgress::new(document.id().to_string(), document.kind(), None, document.stamp());
        let mut items = IndexMap::new();
        if document.kind().embeds_items() {
            for value in document.source().embedded_values() {
                let Some(item_id) = value.get(world_domain::ID_KEY).and_then(|v| v.as_str()) else {
                    continue;
                };
                let stamp = value.get(world_domain::SCHEMA_VERSION_KEY)
                                 .and_then(|raw| SchemaVersion::from_json(raw).ok())
                                 .unwrap_or(SchemaVersion::ZERO);
                items.insert(item_id.to_string(),
                             DocumentProgress::new(item_id.to_string(),
                                                   DocumentKind::Item,
                                                   Some(document.id().to_string()),
                                                   stamp));
            }
        }
        Self { document,
               progress,
               items,
               original_checksum: None }
    }

    /// Igual que `new` pero guarda el checksum inicial para reportar diffs.
    pub fn tracked(document: Document) -> Self {
        let checksum = document.source().checksum().ok();
        let mut working = Self::new(document);
        working.original_checksum = checksum;
        working
    }

    /// El documento o alguno de sus items recibió al menos un paso.
    pub fn is_dirty(&self) -> bool {
        self.progress.is_dirty() || self.items.values().any(DocumentProgress::is_dirty)
    }

    /// Olvida el progreso de items que un handler del actor quitó de la
    /// fuente; no hay documento del que reportar.
    fn prune_removed_items(&mut self) {
        let present: HashSet<&str> = self.document
                                         .source()
                                         .embedded_values()
                                         .iter()
                                         .filter_map(|v| v.get(world_domain::ID_KEY).and_then(|id| id.as_str()))
                                         .collect();
        self.items.retain(|id, _| present.contains(id.as_str()));
    }

    /// Desenlaces del documento seguido de los de sus items, en orden.
    pub fn outcomes(&self) -> Vec<MigrationOutcome> {
        std::iter::once(&self.progress).chain(self.items.values())
                                       .map(DocumentProgress::to_outcome)
                                       .collect()
    }
}

/// Conteo de lo que hizo un paso sobre uno o varios documentos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepApplication {
    pub invocations: usize,
    pub applied: usize,
    pub failed: usize,
}

impl StepApplication {
    pub fn merge(self, other: StepApplication) -> StepApplication {
        StepApplication { invocations: self.invocations + other.invocations,
                          applied: self.applied + other.applied,
                          failed: self.failed + other.failed }
    }
}

/// Aplica un paso a un documento de trabajo.
///
/// Un handler sólo corre si el estampado del documento es menor que la
/// versión del paso. Si falla (o entra en pánico) la fuente vuelve a su
/// estado previo al paso y el documento queda congelado; los demás
/// documentos no se ven afectados.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentUpdater;

impl DocumentUpdater {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, step: &MigrationStep, working: &mut WorkingDocument) -> StepApplication {
        let mut report = StepApplication::default();
        let kind = working.document.kind();
        let version = step.version();

        if let Some(handler) = step.handler(kind) {
            if !working.progress.is_frozen() && working.progress.current_stamp() < version {
                report.invocations += 1;
                debug!("{} {} <- {}", kind, working.progress.document_id, version);
                match run_handler(handler, working.document.source_mut(), None) {
                    Ok(()) => {
                        working.document.source_mut().set_schema_version(version);
                        working.progress.applied_versions.push(version);
                        report.applied += 1;
                    }
                    Err(cause) => {
                        warn!("{} {} falló en {} `{}`: {}", kind, working.progress.document_id, version, step.label(), cause);
                        working.progress.error = Some(TransformError { document_id: working.progress.document_id.clone(),
                                                                       kind,
                                                                       version,
                                                                       cause });
                        report.failed += 1;
                    }
                }
            }
        }

        if kind.embeds_items() {
            self.apply_embedded(step, working, &mut report);
            working.prune_removed_items();
        }
        report
    }

    fn apply_embedded(&self, step: &MigrationStep, working: &mut WorkingDocument, report: &mut StepApplication) {
        let Some(handler) = step.handler(DocumentKind::Item) else {
            return;
        };
        // un actor congelado congela también a sus items
        if working.progress.is_frozen() {
            return;
        }
        let version = step.version();
        let parent_id = working.progress.document_id.clone();
        // el padre que ven los handlers conserva todos sus items
        let parent = working.document.source().clone();
        let mut items = match working.document.source_mut().take_embedded_items() {
            Ok(items) => items,
            Err(e) => {
                working.progress.error = Some(TransformError { document_id: parent_id,
                                                               kind: working.document.kind(),
                                                               version,
                                                               cause: e.to_string() });
                report.failed += 1;
                return;
            }
        };

        for item in items.iter_mut() {
            let Some(item_id) = item.id().map(str::to_string) else {
                continue;
            };
            let stamp = item.schema_version().unwrap_or(SchemaVersion::ZERO);
            // items agregados por un handler del actor entran con su estampado actual
            let progress = working.items
                                  .entry(item_id.clone())
                                  .or_insert_with(|| DocumentProgress::new(item_id.clone(), DocumentKind::Item, Some(parent_id.clone()), stamp));
            if progress.is_frozen() || stamp >= version {
                continue;
            }
            report.invocations += 1;
            debug!("item {} (actor {}) <- {}", item_id, parent_id, version);
            match run_handler(handler, item, Some(&parent)) {
                Ok(()) => {
                    item.set_schema_version(version);
                    progress.applied_versions.push(version);
                    report.applied += 1;
                }
                Err(cause) => {
                    warn!("item {} (actor {}) falló en {} `{}`: {}", item_id, parent_id, version, step.label(), cause);
                    progress.error = Some(TransformError { document_id: item_id,
                                                           kind: DocumentKind::Item,
                                                           version,
                                                           cause });
                    report.failed += 1;
                }
            }
        }
        working.document.source_mut().restore_embedded_items(items);
    }
}

/// Corre un handler sobre una copia de seguridad implícita: ante error o
/// pánico la fuente queda exactamente como estaba.
fn run_handler(handler: &TransformFn, source: &mut DocumentSource, parent: Option<&DocumentSource>) -> Result<(), String> {
    let backup = source.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(source, parent)));
    let cause = match outcome {
        Ok(Ok(())) => return Ok(()),
        Ok(Err(e)) => format!("{:#}", e),
        Err(payload) => format!("pánico en handler: {}", panic_message(payload.as_ref())),
    };
    *source = backup;
    Err(cause)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload.downcast_ref::<&str>()
           .map(|s| s.to_string())
           .or_else(|| payload.downcast_ref::<String>().cloned())
           .unwrap_or_else(|| "desconocido".to_string())
}
