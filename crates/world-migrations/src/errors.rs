use thiserror::Error;

// Errores del catálogo de pasos de release.
//
// Un paso del catálogo puede fallar al construirse (versión inválida) o al
// registrarse (conflicto de versión, handler faltante); ambos casos son
// errores duros y se detectan antes de migrar ningún documento.
#[derive(Error, Debug)]
pub enum CatalogError {
  /// Errores del motor de migración (registro/validación).
  #[error("Error de migración: {0}")]
  Migration(#[from] migration::MigrationError),

  /// Un paso del catálogo es inconsistente consigo mismo.
  #[error("Paso inválido `{name}`: {reason}")]
  InvalidStep { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
