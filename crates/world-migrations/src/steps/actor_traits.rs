use crate::errors::Result;
use crate::step::ReleaseStep;
use anyhow::bail;
use migration::MigrationStep;
use serde_json::{json, Value as JsonValue};
use world_domain::DocumentSource;

/// 0.1: `system.traits` pasa de cadena separada por comas a lista.
pub struct ActorTraitsToList;

impl ActorTraitsToList {
  pub fn migrate_actor(source: &mut DocumentSource) -> anyhow::Result<()> {
    let traits = match source.get_path("system.traits") {
      None | Some(JsonValue::Array(_)) => return Ok(()),
      Some(JsonValue::Null) => Vec::new(),
      Some(JsonValue::String(raw)) => raw.split(',')
                                         .map(str::trim)
                                         .filter(|t| !t.is_empty())
                                         .map(|t| json!(t))
                                         .collect(),
      Some(other) => bail!("system.traits inesperado: {}", other),
    };
    source.set_path("system.traits", JsonValue::Array(traits))?;
    Ok(())
  }
}

impl ReleaseStep for ActorTraitsToList {
  fn version(&self) -> f64 {
    0.1
  }

  fn name(&self) -> &'static str {
    "actor-traits-list"
  }

  fn build(&self) -> Result<MigrationStep> {
    Ok(MigrationStep::builder(self.version(), self.name()).actor(Self::migrate_actor)
                                                           .build()?)
  }
}
