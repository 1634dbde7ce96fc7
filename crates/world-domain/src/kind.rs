// kind.rs
use crate::DocumentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tipos de documento persistidos en un mundo.
///
/// El orden de declaración es el orden de migración: primero los tipos sin
/// referencias cruzadas (ajustes, usuarios), luego actores junto con sus
/// items embebidos, items sueltos y al final tablas, diarios y macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
  Setting,
  User,
  Actor,
  Item,
  RollTable,
  JournalEntry,
  Macro,
}

impl DocumentKind {
  /// Orden fijo en el que el runner recorre las colecciones.
  pub const MIGRATION_ORDER: [DocumentKind; 7] = [DocumentKind::Setting,
                                                  DocumentKind::User,
                                                  DocumentKind::Actor,
                                                  DocumentKind::Item,
                                                  DocumentKind::RollTable,
                                                  DocumentKind::JournalEntry,
                                                  DocumentKind::Macro];

  pub fn as_str(self) -> &'static str {
    match self {
      DocumentKind::Setting => "setting",
      DocumentKind::User => "user",
      DocumentKind::Actor => "actor",
      DocumentKind::Item => "item",
      DocumentKind::RollTable => "rollTable",
      DocumentKind::JournalEntry => "journalEntry",
      DocumentKind::Macro => "macro",
    }
  }

  /// Nombre de la colección en el export del mundo y en la base de datos.
  pub fn collection(self) -> &'static str {
    match self {
      DocumentKind::Setting => "settings",
      DocumentKind::User => "users",
      DocumentKind::Actor => "actors",
      DocumentKind::Item => "items",
      DocumentKind::RollTable => "tables",
      DocumentKind::JournalEntry => "journal",
      DocumentKind::Macro => "macros",
    }
  }

  /// Sólo los actores poseen items embebidos.
  pub fn embeds_items(self) -> bool {
    matches!(self, DocumentKind::Actor)
  }

  /// Dos tipos comparten unidad de migración cuando sus handlers pueden
  /// correr sobre el mismo documento padre: actor e item se migran juntos.
  pub fn shares_unit_with(self, other: DocumentKind) -> bool {
    self == other
    || matches!((self, other),
                (DocumentKind::Actor, DocumentKind::Item) | (DocumentKind::Item, DocumentKind::Actor))
  }
}

impl fmt::Display for DocumentKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for DocumentKind {
  type Err = DocumentError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase();
    DocumentKind::MIGRATION_ORDER.iter()
                                 .copied()
                                 .find(|k| k.as_str().to_lowercase() == wanted || k.collection() == wanted)
                                 .ok_or_else(|| DocumentError::UnknownKind(s.to_string()))
  }
}
