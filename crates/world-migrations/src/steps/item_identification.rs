use crate::errors::Result;
use crate::step::ReleaseStep;
use migration::MigrationStep;
use serde_json::{json, Value as JsonValue};
use world_domain::DocumentSource;

/// 0.4: `system.identified` pasa a ser obligatorio.
///
/// Los items en poder de un actor `npc` quedan identificados; los demás
/// conservan su valor o toman `false` por defecto.
pub struct ItemIdentification;

impl ItemIdentification {
  pub fn migrate_item(source: &mut DocumentSource, parent: Option<&DocumentSource>) -> anyhow::Result<()> {
    let owned_by_npc = parent.is_some_and(|p| p.is_type("npc"));
    let identified = match source.get_path("system.identified") {
      _ if owned_by_npc => true,
      Some(JsonValue::Bool(flag)) => *flag,
      _ => false,
    };
    source.set_path("system.identified", json!(identified))?;
    Ok(())
  }
}

impl ReleaseStep for ItemIdentification {
  fn version(&self) -> f64 {
    0.4
  }

  fn name(&self) -> &'static str {
    "item-identification"
  }

  fn build(&self) -> Result<MigrationStep> {
    Ok(MigrationStep::builder(self.version(), self.name()).item(Self::migrate_item)
                                                           .build()?)
  }
}
