use thiserror::Error;
use world_domain::DocumentError;

/// Errores del almacenamiento SQLite.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("pool: {0}")]
  Pool(#[from] r2d2::Error),
  #[error("db: {0}")]
  Db(#[from] diesel::result::Error),
  #[error("migraciones del esquema: {0}")]
  Schema(String),
  #[error("documento almacenado inválido: {0}")]
  Document(#[from] DocumentError),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
  #[error("tarea bloqueante interrumpida: {0}")]
  Join(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
