use crate::errors::Result;
use crate::step::ReleaseStep;
use crate::steps::{ActorTraitsToList, CharacterExperience, ItemIdentification, ItemQuantityRename, SheetHousekeeping};
use log::info;
use migration::MigrationRegistry;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static SHARED: OnceCell<Arc<MigrationRegistry>> = OnceCell::new();

/// Pasos publicados, en orden de release.
pub fn release_steps() -> Vec<Box<dyn ReleaseStep>> {
  vec![Box::new(ActorTraitsToList),
       Box::new(ItemQuantityRename),
       Box::new(CharacterExperience),
       Box::new(ItemIdentification),
       Box::new(SheetHousekeeping)]
}

/// Construye, valida y registra todos los pasos del catálogo.
pub fn catalog() -> Result<MigrationRegistry> {
  let mut registry = MigrationRegistry::new();
  for release in release_steps() {
    let step = release.build()?;
    release.validate(&step)?;
    registry.register(step)?;
  }
  info!("catálogo cargado: {} pasos, última versión {}", registry.len(), registry.latest_version());
  Ok(registry)
}

/// Registro compartido del proceso; se construye una sola vez.
pub fn shared_registry() -> Result<Arc<MigrationRegistry>> {
  SHARED.get_or_try_init(|| catalog().map(Arc::new)).cloned()
}
