use crate::errors::Result;
use crate::step::ReleaseStep;
use anyhow::bail;
use migration::MigrationStep;
use serde_json::{json, Value as JsonValue};
use world_domain::{DocumentKind, DocumentSource};

const LEGACY_SETTING_PREFIX: &str = "dnd.";
const SETTING_PREFIX: &str = "world.";

/// 0.5: limpieza de los tipos sin items en una sola versión.
///
/// Cada tipo tiene su propio handler; todos comparten versión porque
/// ninguno comparte unidad de migración con otro.
pub struct SheetHousekeeping;

impl SheetHousekeeping {
  /// `flags.legacy.color` sube a `color`; el objeto `legacy` vacío se borra.
  pub fn migrate_user(source: &mut DocumentSource) -> anyhow::Result<()> {
    if let Some(color) = source.remove_path("flags.legacy.color") {
      if source.get("color").is_none() {
        source.insert("color", color);
      }
    }
    let legacy_empty = matches!(source.get_path("flags.legacy"), Some(JsonValue::Object(m)) if m.is_empty());
    if legacy_empty {
      source.remove_path("flags.legacy");
    }
    Ok(())
  }

  /// `content` pasa a `text.content`.
  pub fn migrate_journal(source: &mut DocumentSource) -> anyhow::Result<()> {
    source.rename_path("content", "text.content")?;
    Ok(())
  }

  pub fn migrate_macro(source: &mut DocumentSource) -> anyhow::Result<()> {
    match source.get("command") {
      Some(JsonValue::String(cmd)) => {
        let trimmed = cmd.trim().to_string();
        source.insert("command", json!(trimmed));
      }
      None | Some(JsonValue::Null) => {}
      Some(other) => bail!("command inesperado: {}", other),
    }
    if !matches!(source.get("type"), Some(JsonValue::String(_))) {
      source.insert("type", json!("script"));
    }
    Ok(())
  }

  /// Resultados sin `weight` pesan 1.
  pub fn migrate_table(source: &mut DocumentSource) -> anyhow::Result<()> {
    let Some(results) = source.get_path_mut("results") else {
      return Ok(());
    };
    let JsonValue::Array(results) = results else {
      bail!("results no es una lista");
    };
    for result in results.iter_mut().filter_map(JsonValue::as_object_mut) {
      result.entry("weight").or_insert_with(|| json!(1));
    }
    Ok(())
  }

  pub fn migrate_setting(source: &mut DocumentSource) -> anyhow::Result<()> {
    let renamed = match source.get("key") {
      Some(JsonValue::String(key)) => key.strip_prefix(LEGACY_SETTING_PREFIX)
                                         .map(|rest| format!("{}{}", SETTING_PREFIX, rest)),
      _ => None,
    };
    if let Some(key) = renamed {
      source.insert("key", json!(key));
    }
    Ok(())
  }
}

impl ReleaseStep for SheetHousekeeping {
  fn version(&self) -> f64 {
    0.5
  }

  fn name(&self) -> &'static str {
    "sheet-housekeeping"
  }

  fn build(&self) -> Result<MigrationStep> {
    Ok(MigrationStep::builder(self.version(), self.name()).document(DocumentKind::User, Self::migrate_user)
                                                           .document(DocumentKind::JournalEntry, Self::migrate_journal)
                                                           .document(DocumentKind::Macro, Self::migrate_macro)
                                                           .document(DocumentKind::RollTable, Self::migrate_table)
                                                           .document(DocumentKind::Setting, Self::migrate_setting)
                                                           .build()?)
  }
}
