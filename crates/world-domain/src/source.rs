// source.rs
use crate::{DocumentError, SchemaVersion};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use sha2::{Digest, Sha256};

/// Clave donde cada fuente guarda su versión de esquema.
pub const SCHEMA_VERSION_KEY: &str = "schemaVersion";
/// Clave del identificador persistido.
pub const ID_KEY: &str = "_id";
/// Clave bajo la que un actor guarda sus items embebidos.
pub const EMBEDDED_ITEMS_KEY: &str = "items";
/// Discriminador explícito del subtipo (`character`, `npc`, `weapon`...).
pub const TYPE_KEY: &str = "type";

/// Árbol mutable y opaco de claves string -> valores JSON.
///
/// Representa un registro persistido *antes* de cualquier validación
/// tipada: su forma está, por construcción, desfasada respecto al esquema
/// actual, así que no se modela con structs. Se conserva el orden de
/// inserción de las claves para que la escritura sea estable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentSource(Map<String, JsonValue>);

impl DocumentSource {
  pub fn new() -> Self {
    Self(Map::new())
  }

  /// Construye la fuente desde un valor JSON; debe ser un objeto.
  pub fn from_value(value: JsonValue) -> Result<Self, DocumentError> {
    match value {
      JsonValue::Object(map) => Ok(Self(map)),
      other => Err(DocumentError::InvalidSource(format!("se esperaba un objeto, se obtuvo {}", type_name(&other)))),
    }
  }

  pub fn into_value(self) -> JsonValue {
    JsonValue::Object(self.0)
  }

  pub fn as_map(&self) -> &Map<String, JsonValue> {
    &self.0
  }

  pub fn as_map_mut(&mut self) -> &mut Map<String, JsonValue> {
    &mut self.0
  }

  pub fn id(&self) -> Option<&str> {
    self.0.get(ID_KEY).and_then(JsonValue::as_str)
  }

  /// Valor del discriminador `type`, si existe.
  pub fn document_type(&self) -> Option<&str> {
    self.0.get(TYPE_KEY).and_then(JsonValue::as_str)
  }

  /// Compara el discriminador explícito `type` con `expected`.
  pub fn is_type(&self, expected: &str) -> bool {
    self.document_type() == Some(expected)
  }

  /// Versión estampada en la fuente; ausente equivale a cero.
  pub fn schema_version(&self) -> Result<SchemaVersion, DocumentError> {
    match self.0.get(SCHEMA_VERSION_KEY) {
      Some(v) => SchemaVersion::from_json(v),
      None => Ok(SchemaVersion::ZERO),
    }
  }

  pub fn set_schema_version(&mut self, version: SchemaVersion) {
    self.0.insert(SCHEMA_VERSION_KEY.to_string(), version.to_json());
  }

  pub fn get(&self, key: &str) -> Option<&JsonValue> {
    self.0.get(key)
  }

  pub fn insert(&mut self, key: &str, value: JsonValue) -> Option<JsonValue> {
    self.0.insert(key.to_string(), value)
  }

  /// Lectura por ruta con puntos (`system.details.xp`).
  pub fn get_path(&self, path: &str) -> Option<&JsonValue> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = self.0.get(first)?;
    for part in parts {
      current = current.as_object()?.get(part)?;
    }
    Some(current)
  }

  pub fn get_path_mut(&mut self, path: &str) -> Option<&mut JsonValue> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = self.0.get_mut(first)?;
    for part in parts {
      current = current.as_object_mut()?.get_mut(part)?;
    }
    Some(current)
  }

  pub fn contains_path(&self, path: &str) -> bool {
    self.get_path(path).is_some()
  }

  /// Escribe `value` en `path`, creando los objetos intermedios que falten.
  /// Falla si un segmento intermedio existe y no es un objeto.
  pub fn set_path(&mut self, path: &str, value: JsonValue) -> Result<Option<JsonValue>, DocumentError> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments.split_last()
                                  .ok_or_else(|| DocumentError::InvalidSource("ruta vacía".into()))?;
    let mut current = &mut self.0;
    for seg in parents {
      let slot = current.entry(seg.to_string())
                        .or_insert_with(|| JsonValue::Object(Map::new()));
      current = slot.as_object_mut().ok_or_else(|| {
                                       DocumentError::InvalidSource(format!("el segmento `{}` de `{}` no es un objeto", seg, path))
                                     })?;
    }
    Ok(current.insert(last.to_string(), value))
  }

  /// Elimina el valor en `path` conservando el orden del resto de claves.
  pub fn remove_path(&mut self, path: &str) -> Option<JsonValue> {
    match path.rsplit_once('.') {
      None => self.0.shift_remove(path),
      Some((parent, last)) => self.get_path_mut(parent)?.as_object_mut()?.shift_remove(last),
    }
  }

  /// Mueve el valor de `from` a `to`. Devuelve `false` si `from` no existe.
  pub fn rename_path(&mut self, from: &str, to: &str) -> Result<bool, DocumentError> {
    match self.remove_path(from) {
      Some(value) => {
        self.set_path(to, value)?;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Items embebidos tal como están en la fuente (vacío si no hay).
  pub fn embedded_values(&self) -> &[JsonValue] {
    match self.0.get(EMBEDDED_ITEMS_KEY) {
      Some(JsonValue::Array(items)) => items.as_slice(),
      _ => &[],
    }
  }

  /// Extrae los items embebidos dejando un arreglo vacío en su lugar (la
  /// clave conserva su posición). Si algún elemento no es un objeto no se
  /// modifica la fuente.
  pub fn take_embedded_items(&mut self) -> Result<Vec<DocumentSource>, DocumentError> {
    let items = match self.0.get_mut(EMBEDDED_ITEMS_KEY) {
      None | Some(JsonValue::Null) => return Ok(Vec::new()),
      Some(JsonValue::Array(items)) => items,
      Some(other) => {
        return Err(DocumentError::InvalidSource(format!("`{}` debe ser un arreglo, se obtuvo {}",
                                                        EMBEDDED_ITEMS_KEY,
                                                        type_name(other))))
      }
    };
    if let Some(bad) = items.iter().find(|v| !v.is_object()) {
      return Err(DocumentError::InvalidSource(format!("item embebido inválido: {}", type_name(bad))));
    }
    Ok(std::mem::take(items).into_iter()
                            .filter_map(|v| match v {
                              JsonValue::Object(map) => Some(DocumentSource(map)),
                              _ => None,
                            })
                            .collect())
  }

  /// Devuelve los items embebidos a la fuente, en el mismo orden.
  pub fn restore_embedded_items(&mut self, items: Vec<DocumentSource>) {
    if items.is_empty() && !self.0.contains_key(EMBEDDED_ITEMS_KEY) {
      return;
    }
    let values = items.into_iter().map(DocumentSource::into_value).collect();
    self.0.insert(EMBEDDED_ITEMS_KEY.to_string(), JsonValue::Array(values));
  }

  /// SHA-256 (hex) de la serialización JSON de la fuente.
  pub fn checksum(&self) -> Result<String, DocumentError> {
    let bytes = serde_json::to_vec(&self.0)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
  }
}

impl TryFrom<JsonValue> for DocumentSource {
  type Error = DocumentError;

  fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
    Self::from_value(value)
  }
}

fn type_name(value: &JsonValue) -> &'static str {
  match value {
    JsonValue::Null => "null",
    JsonValue::Bool(_) => "bool",
    JsonValue::Number(_) => "número",
    JsonValue::String(_) => "string",
    JsonValue::Array(_) => "arreglo",
    JsonValue::Object(_) => "objeto",
  }
}
