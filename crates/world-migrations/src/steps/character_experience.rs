use crate::errors::Result;
use crate::step::ReleaseStep;
use anyhow::bail;
use migration::MigrationStep;
use serde_json::json;
use world_domain::DocumentSource;

/// Umbrales de experiencia por nivel (niveles 2 a 20).
const XP_THRESHOLDS: [u64; 19] = [300, 900, 2_700, 6_500, 14_000, 23_000, 34_000, 48_000, 64_000, 85_000, 100_000, 120_000,
                                  140_000, 165_000, 195_000, 225_000, 265_000, 305_000, 355_000];

/// 0.3: la experiencia plana `system.xp` de personajes pasa a
/// `system.details.xp {value, max}`.
///
/// Sólo aplica a actores cuyo discriminador `type` es `"character"`; el
/// resto de actores conserva su `system.xp`.
pub struct CharacterExperience;

impl CharacterExperience {
  pub fn migrate_actor(source: &mut DocumentSource) -> anyhow::Result<()> {
    if !source.is_type("character") {
      return Ok(());
    }
    let Some(raw) = source.get_path("system.xp").cloned() else {
      return Ok(());
    };
    let value = match raw.as_f64() {
      Some(xp) if xp >= 0.0 => xp.round() as u64,
      _ => bail!("system.xp inválido: {}", raw),
    };
    source.remove_path("system.xp");
    source.set_path("system.details.xp", json!({"value": value, "max": Self::next_threshold(value)}))?;
    Ok(())
  }

  /// Experiencia necesaria para el siguiente nivel; el último umbral si ya
  /// se alcanzó el nivel máximo.
  pub fn next_threshold(xp: u64) -> u64 {
    XP_THRESHOLDS.iter()
                 .copied()
                 .find(|t| *t > xp)
                 .unwrap_or(XP_THRESHOLDS[XP_THRESHOLDS.len() - 1])
  }
}

impl ReleaseStep for CharacterExperience {
  fn version(&self) -> f64 {
    0.3
  }

  fn name(&self) -> &'static str {
    "character-experience"
  }

  fn build(&self) -> Result<MigrationStep> {
    Ok(MigrationStep::builder(self.version(), self.name()).actor(Self::migrate_actor)
                                                           .build()?)
  }
}
