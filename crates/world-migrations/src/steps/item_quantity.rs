use crate::errors::Result;
use crate::step::ReleaseStep;
use anyhow::{bail, Context};
use migration::MigrationStep;
use serde_json::{json, Value as JsonValue};
use world_domain::DocumentSource;

/// 0.2: `system.qty` se renombra a `system.quantity` (numérico).
pub struct ItemQuantityRename;

impl ItemQuantityRename {
  pub fn migrate_item(source: &mut DocumentSource, _parent: Option<&DocumentSource>) -> anyhow::Result<()> {
    let Some(legacy) = source.remove_path("system.qty") else {
      return Ok(());
    };
    // si ya existe `quantity` gana el valor nuevo
    if source.contains_path("system.quantity") {
      return Ok(());
    }
    let quantity = match legacy {
      JsonValue::Number(n) => JsonValue::Number(n),
      JsonValue::Null => json!(0),
      JsonValue::String(raw) => {
        let parsed: i64 = raw.trim().parse().with_context(|| format!("system.qty no numérico: {:?}", raw))?;
        json!(parsed)
      }
      other => bail!("system.qty inesperado: {}", other),
    };
    source.set_path("system.quantity", quantity)?;
    Ok(())
  }
}

impl ReleaseStep for ItemQuantityRename {
  fn version(&self) -> f64 {
    0.2
  }

  fn name(&self) -> &'static str {
    "item-quantity-rename"
  }

  fn build(&self) -> Result<MigrationStep> {
    Ok(MigrationStep::builder(self.version(), self.name()).item(Self::migrate_item)
                                                           .build()?)
  }
}
