// Archivo: errors.rs
// Propósito: definir los errores del motor de migración, su severidad y el
// alias Result<T> usado por las APIs del crate.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use world_domain::{DocumentError, DocumentKind, SchemaVersion};

/// Errores del motor de migración.
///
/// - `VersionRegistryConflict` / `StepHandlerMissing`: registro inválido,
///   se detectan al registrar los pasos.
/// - `InvalidTarget` / `RunInProgress`: abortan la corrida antes de tocar
///   cualquier documento.
/// - `Transform` / `Persist`: fallos por documento; se acumulan en el
///   resumen y nunca abortan a los documentos hermanos.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Dos pasos con la misma versión sobre tipos que comparten unidad, o
    /// una versión que no es un real finito y positivo.
    #[error("Conflicto en el registro de versiones ({version}): {reason}")]
    VersionRegistryConflict { version: f64, reason: String },
    /// El paso declara un tipo en `applies_to` pero no registra handler.
    #[error("El paso {version} declara `{kind}` pero no registra handler")]
    StepHandlerMissing { version: f64, kind: DocumentKind },
    /// Versión objetivo por encima de la última registrada.
    #[error("Versión objetivo inválida: {0}")]
    InvalidTarget(String),
    /// Ya hay una corrida activa sobre el mismo mundo.
    #[error("Ya hay una migración en curso para el mundo {0}")]
    RunInProgress(String),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// El cargador no pudo entregar el corpus.
    #[error("Error de carga: {0}")]
    Load(String),
    #[error("Documento inválido: {0}")]
    Document(#[from] DocumentError),
}

/// Clasificación de un fallo para decidir si la corrida puede continuar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    /// Detiene la corrida y bloquea el estampado del mundo.
    Hard,
    /// Se registra en el resumen; la corrida sigue.
    Soft,
}

impl MigrationError {
    pub fn severity(&self) -> Severity {
        match self {
            MigrationError::Transform(_) | MigrationError::Persist(_) => Severity::Soft,
            _ => Severity::Hard,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity() == Severity::Hard
    }
}

/// Un handler falló sobre un documento (o item embebido) en una versión.
/// El documento queda congelado en su último estampado válido.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("Fallo al transformar {kind} {document_id} en la versión {version}: {cause}")]
pub struct TransformError {
    pub document_id: String,
    pub kind: DocumentKind,
    pub version: SchemaVersion,
    pub cause: String,
}

/// No se pudo escribir un documento (o el estampado del mundo) en el
/// almacenamiento. `kind` es `None` para el estampado del mundo.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("Fallo al persistir {document_id} tras {attempts} intento(s): {message}")]
pub struct PersistError {
    pub kind: Option<DocumentKind>,
    pub document_id: String,
    pub attempts: u32,
    pub message: String,
}

impl PersistError {
    pub fn new(kind: Option<DocumentKind>, document_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind,
               document_id: document_id.into(),
               attempts: 1,
               message: message.into() }
    }
}

/// Alias de resultado usado por las APIs del crate.
pub type Result<T> = std::result::Result<T, MigrationError>;
