// errors.rs
use thiserror::Error;

/// Errores del modelo de documentos del mundo.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
  #[error("Tipo de documento desconocido: {0}")]
  UnknownKind(String),
  #[error("Documento sin identificador `_id` en la colección {0}")]
  MissingId(String),
  #[error("Versión de esquema inválida: {0}")]
  InvalidVersion(String),
  #[error("Fuente de documento inválida: {0}")]
  InvalidSource(String),
  #[error("Documento duplicado {kind}/{id}")]
  Duplicate { kind: String, id: String },
  #[error("Error de serialización: {0}")]
  SerializationError(String),
}

impl From<serde_json::Error> for DocumentError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
