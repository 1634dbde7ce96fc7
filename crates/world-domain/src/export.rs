// export.rs
//
// Formato de intercambio JSON de un mundo completo. Es el formato que usa
// el binario para importar mundos y el que se vuelca en los reportes.
use crate::{Document, DocumentError, DocumentKind, SchemaVersion, World};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldExport {
  pub id: String,
  #[serde(default)]
  pub schema_version: SchemaVersion,
  #[serde(default)]
  pub settings: Vec<JsonValue>,
  #[serde(default)]
  pub users: Vec<JsonValue>,
  #[serde(default)]
  pub actors: Vec<JsonValue>,
  #[serde(default)]
  pub items: Vec<JsonValue>,
  #[serde(default)]
  pub tables: Vec<JsonValue>,
  #[serde(default)]
  pub journal: Vec<JsonValue>,
  #[serde(default)]
  pub macros: Vec<JsonValue>,
}

impl WorldExport {
  fn collection(&self, kind: DocumentKind) -> &Vec<JsonValue> {
    match kind {
      DocumentKind::Setting => &self.settings,
      DocumentKind::User => &self.users,
      DocumentKind::Actor => &self.actors,
      DocumentKind::Item => &self.items,
      DocumentKind::RollTable => &self.tables,
      DocumentKind::JournalEntry => &self.journal,
      DocumentKind::Macro => &self.macros,
    }
  }

  fn collection_mut(&mut self, kind: DocumentKind) -> &mut Vec<JsonValue> {
    match kind {
      DocumentKind::Setting => &mut self.settings,
      DocumentKind::User => &mut self.users,
      DocumentKind::Actor => &mut self.actors,
      DocumentKind::Item => &mut self.items,
      DocumentKind::RollTable => &mut self.tables,
      DocumentKind::JournalEntry => &mut self.journal,
      DocumentKind::Macro => &mut self.macros,
    }
  }
}

impl TryFrom<WorldExport> for World {
  type Error = DocumentError;

  fn try_from(export: WorldExport) -> Result<Self, Self::Error> {
    let mut world = World::new(export.id.clone(), export.schema_version);
    for kind in DocumentKind::MIGRATION_ORDER {
      for value in export.collection(kind) {
        world.insert(Document::from_value(kind, value.clone())?)?;
      }
    }
    Ok(world)
  }
}

impl From<&World> for WorldExport {
  fn from(world: &World) -> Self {
    let mut export = WorldExport { id: world.id().to_string(),
                                   schema_version: world.schema_version(),
                                   ..Default::default() };
    for kind in DocumentKind::MIGRATION_ORDER {
      let values = world.documents(kind).map(|d| d.source().clone().into_value()).collect();
      *export.collection_mut(kind) = values;
    }
    export
  }
}

impl World {
  /// Parsea un export JSON (`WorldExport`) y valida todos sus documentos.
  pub fn from_json_str(raw: &str) -> Result<World, DocumentError> {
    let export: WorldExport = serde_json::from_str(raw)?;
    World::try_from(export)
  }

  pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&WorldExport::from(self))?)
  }
}
