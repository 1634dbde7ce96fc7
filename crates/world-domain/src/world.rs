// world.rs
use crate::{Document, DocumentError, DocumentKind, SchemaVersion};
use indexmap::IndexMap;

/// Instantánea en memoria de todos los documentos de un mundo.
///
/// Cada colección conserva el orden de carga, de modo que una migración
/// recorre y reporta los documentos siempre en el mismo orden.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
  id: String,
  schema_version: SchemaVersion,
  collections: IndexMap<DocumentKind, IndexMap<String, Document>>,
}

impl World {
  pub fn new(id: impl Into<String>, schema_version: SchemaVersion) -> Self {
    Self { id: id.into(), schema_version, collections: IndexMap::new() }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  /// Versión estampada en los ajustes del mundo.
  pub fn schema_version(&self) -> SchemaVersion {
    self.schema_version
  }

  pub fn set_schema_version(&mut self, version: SchemaVersion) {
    self.schema_version = version;
  }

  /// Inserta un documento; falla si ya existe otro con el mismo id y tipo.
  pub fn insert(&mut self, doc: Document) -> Result<(), DocumentError> {
    let collection = self.collections.entry(doc.kind()).or_default();
    if collection.contains_key(doc.id()) {
      return Err(DocumentError::Duplicate { kind: doc.kind().to_string(), id: doc.id().to_string() });
    }
    collection.insert(doc.id().to_string(), doc);
    Ok(())
  }

  /// Inserta o reemplaza (conservando la posición) y devuelve el anterior.
  pub fn upsert(&mut self, doc: Document) -> Option<Document> {
    self.collections.entry(doc.kind()).or_default().insert(doc.id().to_string(), doc)
  }

  pub fn get(&self, kind: DocumentKind, id: &str) -> Option<&Document> {
    self.collections.get(&kind).and_then(|c| c.get(id))
  }

  pub fn documents(&self, kind: DocumentKind) -> impl Iterator<Item = &Document> {
    self.collections.get(&kind).into_iter().flat_map(|c| c.values())
  }

  pub fn count(&self, kind: DocumentKind) -> usize {
    self.collections.get(&kind).map(|c| c.len()).unwrap_or(0)
  }

  pub fn len(&self) -> usize {
    self.collections.values().map(|c| c.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Saca los documentos de un tipo para procesarlos fuera del mundo (por
  /// ejemplo en paralelo). Deben devolverse con `restore_documents`.
  pub fn take_documents(&mut self, kind: DocumentKind) -> Vec<Document> {
    self.collections
        .get_mut(&kind)
        .map(|c| std::mem::take(c).into_values().collect())
        .unwrap_or_default()
  }

  /// Devuelve a la colección los documentos extraídos, en su orden.
  pub fn restore_documents(&mut self, kind: DocumentKind, docs: Vec<Document>) {
    let collection = self.collections.entry(kind).or_default();
    for doc in docs {
      collection.insert(doc.id().to_string(), doc);
    }
  }
}
