use crate::errors::{CatalogError, Result};
use migration::MigrationStep;

/// Un paso de release: conoce su versión y sabe construir el
/// `MigrationStep` con los handlers de cada tipo que toca.
pub trait ReleaseStep: Send + Sync {
  /// Versión de esquema que introduce el paso.
  fn version(&self) -> f64;

  /// Nombre corto para logs y reportes.
  fn name(&self) -> &'static str;

  /// Construye el paso con sus handlers.
  fn build(&self) -> Result<MigrationStep>;

  /// Verifica que el paso construido conserve versión y nombre.
  fn validate(&self, step: &MigrationStep) -> Result<()> {
    if step.version().value() != self.version() || step.label() != self.name() {
      return Err(CatalogError::InvalidStep { name: self.name().to_string(),
                                             reason: format!("construye {} `{}`", step.version(), step.label()) });
    }
    Ok(())
  }
}
