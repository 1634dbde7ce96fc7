use crate::{Document, DocumentError, DocumentKind, SchemaVersion, World};
use serde_json::{json, Value as JsonValue};

pub struct WorldStubs;

impl WorldStubs {
  /// Fuente de actor con items embebidos. `stamp` negativo omite la clave
  /// `schemaVersion` (documentos que nunca se migraron).
  pub fn actor(id: &str, actor_type: &str, stamp: f64, items: Vec<JsonValue>) -> JsonValue {
    let mut src = json!({ "_id": id, "name": format!("actor-{}", id), "type": actor_type, "system": {}, "items": items });
    stamp_value(&mut src, stamp);
    src
  }

  /// Fuente de item con el bloque `system` indicado.
  pub fn item(id: &str, stamp: f64, system: JsonValue) -> JsonValue {
    let mut src = json!({ "_id": id, "name": format!("item-{}", id), "type": "equipment", "system": system });
    stamp_value(&mut src, stamp);
    src
  }

  /// Mundo "legado" (nunca migrado) con al menos un documento de cada tipo.
  /// Sirve para demos y para probar el catálogo de pasos de punta a punta.
  pub fn sample_world() -> Result<World, DocumentError> {
    let mut world = World::new("sample-world", SchemaVersion::ZERO);

    world.insert(Document::from_value(DocumentKind::Setting,
                                      json!({"_id": "set-initiative", "key": "dnd.initiativeDice", "value": "1d20"}))?)?;
    world.insert(Document::from_value(DocumentKind::User,
                                      json!({"_id": "usr-gm", "name": "Gamemaster", "role": 4,
                                             "flags": {"legacy": {"color": "#ff6400"}}}))?)?;

    let sword = Self::item("itm-sword", -1.0, json!({"qty": 1, "equipped": true}));
    let rations = Self::item("itm-rations", -1.0, json!({"qty": 5}));
    let mut hero = Self::actor("act-hero", "character", -1.0, vec![sword, rations]);
    hero["system"] = json!({"traits": "brave, stubborn", "xp": 1200});
    world.insert(Document::from_value(DocumentKind::Actor, hero)?)?;

    let claws = Self::item("itm-claws", -1.0, json!({"qty": 2}));
    let mut goblin = Self::actor("act-goblin", "npc", -1.0, vec![claws]);
    goblin["system"] = json!({"traits": "sneaky", "xp": 50});
    world.insert(Document::from_value(DocumentKind::Actor, goblin)?)?;

    world.insert(Document::from_value(DocumentKind::Item,
                                      Self::item("itm-potion", -1.0, json!({"qty": 3, "identified": false})))?)?;
    world.insert(Document::from_value(DocumentKind::RollTable,
                                      json!({"_id": "tbl-loot", "name": "Loot",
                                             "results": [{"text": "gold"}, {"text": "gem", "weight": 3}]}))?)?;
    world.insert(Document::from_value(DocumentKind::JournalEntry,
                                      json!({"_id": "jrn-intro", "name": "Intro", "content": "<p>Welcome</p>"}))?)?;
    world.insert(Document::from_value(DocumentKind::Macro,
                                      json!({"_id": "mac-roll", "name": "Roll", "command": "  roll('1d20')  "}))?)?;
    Ok(world)
  }
}

fn stamp_value(src: &mut JsonValue, stamp: f64) {
  if stamp >= 0.0 {
    src[crate::SCHEMA_VERSION_KEY] = json!(stamp);
  }
}
