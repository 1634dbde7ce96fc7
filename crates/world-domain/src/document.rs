// document.rs
use crate::{DocumentError, DocumentKind, DocumentSource, SchemaVersion};
use serde_json::Value as JsonValue;

/// Un registro persistido de un tipo dado junto con su fuente cruda.
///
/// El `id` se lee de `_id` al construir el documento y no cambia durante
/// la migración aunque un handler reescriba la fuente.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  id: String,
  kind: DocumentKind,
  source: DocumentSource,
}

impl Document {
  /// Valida la fuente: `_id` obligatorio, versión legible y, para actores,
  /// items embebidos que sean objetos con su propio `_id` y versión.
  pub fn new(kind: DocumentKind, source: DocumentSource) -> Result<Self, DocumentError> {
    let id = source.id()
                   .filter(|s| !s.trim().is_empty())
                   .ok_or_else(|| DocumentError::MissingId(kind.collection().to_string()))?
                   .to_string();
    source.schema_version()?;
    if kind.embeds_items() {
      let mut seen = std::collections::HashSet::new();
      for item in source.embedded_values() {
        let map = item.as_object()
                      .ok_or_else(|| DocumentError::InvalidSource(format!("actor {}: item embebido no es un objeto", id)))?;
        if !map.get(crate::ID_KEY).and_then(JsonValue::as_str).is_some_and(|s| !s.trim().is_empty()) {
          return Err(DocumentError::MissingId(format!("{}.{}", id, crate::EMBEDDED_ITEMS_KEY)));
        }
        let item_id = map.get(crate::ID_KEY).and_then(JsonValue::as_str).unwrap_or_default();
        if !seen.insert(item_id.to_string()) {
          return Err(DocumentError::Duplicate { kind: format!("{}.{}", id, crate::EMBEDDED_ITEMS_KEY),
                                                id: item_id.to_string() });
        }
        SchemaVersion::from_json(map.get(crate::SCHEMA_VERSION_KEY).unwrap_or(&JsonValue::Null))?;
      }
    }
    Ok(Self { id, kind, source })
  }

  pub fn from_value(kind: DocumentKind, value: JsonValue) -> Result<Self, DocumentError> {
    Self::new(kind, DocumentSource::from_value(value)?)
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn kind(&self) -> DocumentKind {
    self.kind
  }

  pub fn source(&self) -> &DocumentSource {
    &self.source
  }

  pub fn source_mut(&mut self) -> &mut DocumentSource {
    &mut self.source
  }

  pub fn into_source(self) -> DocumentSource {
    self.source
  }

  /// Versión estampada en el propio documento (sin mirar sus items).
  pub fn stamp(&self) -> SchemaVersion {
    self.source.schema_version().unwrap_or(SchemaVersion::ZERO)
  }

  /// Estampados de los items embebidos, en orden (cero si faltan).
  pub fn embedded_stamps(&self) -> Vec<SchemaVersion> {
    self.source
        .embedded_values()
        .iter()
        .map(|v| {
          v.get(crate::SCHEMA_VERSION_KEY)
           .map(|raw| SchemaVersion::from_json(raw).unwrap_or(SchemaVersion::ZERO))
           .unwrap_or(SchemaVersion::ZERO)
        })
        .collect()
  }

  /// Menor versión entre el documento y sus items embebidos: a partir de
  /// ella hay pasos potencialmente aplicables.
  pub fn min_stamp(&self) -> SchemaVersion {
    self.embedded_stamps().into_iter().fold(self.stamp(), SchemaVersion::min)
  }

  pub fn embedded_item_ids(&self) -> Vec<String> {
    self.source
        .embedded_values()
        .iter()
        .filter_map(|v| v.get(crate::ID_KEY).and_then(JsonValue::as_str))
        .map(str::to_string)
        .collect()
  }
}
