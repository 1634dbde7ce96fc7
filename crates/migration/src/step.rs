// Archivo: step.rs
// Propósito: definir `MigrationStep`, la unidad de cambio de esquema: una
// versión, una etiqueta y un handler por tipo de documento.
use crate::errors::{MigrationError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use world_domain::{DocumentKind, DocumentSource, SchemaVersion};

/// Función de transformación. Recibe la fuente mutable del documento y,
/// sólo para items embebidos, la fuente del actor padre.
pub type TransformFn = Arc<dyn Fn(&mut DocumentSource, Option<&DocumentSource>) -> anyhow::Result<()> + Send + Sync>;

/// Paso de migración inmutable. Se construye con `MigrationStep::builder`.
#[derive(Clone)]
pub struct MigrationStep {
    version: SchemaVersion,
    label: String,
    applies_to: BTreeSet<DocumentKind>,
    handlers: BTreeMap<DocumentKind, TransformFn>,
}

impl MigrationStep {
    pub fn builder(version: f64, label: impl Into<String>) -> MigrationStepBuilder {
        MigrationStepBuilder { version,
                               label: label.into(),
                               applies_to: BTreeSet::new(),
                               handlers: BTreeMap::new() }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn applies_to(&self) -> &BTreeSet<DocumentKind> {
        &self.applies_to
    }

    pub fn declares(&self, kind: DocumentKind) -> bool {
        self.applies_to.contains(&kind)
    }

    pub fn handler(&self, kind: DocumentKind) -> Option<&TransformFn> {
        self.handlers.get(&kind)
    }

    /// Un paso toca la unidad de un tipo si declara ese tipo o, para
    /// actores, si declara items (se aplican a los items embebidos).
    pub fn touches_unit(&self, kind: DocumentKind) -> bool {
        self.declares(kind) || (kind.embeds_items() && self.declares(DocumentKind::Item))
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
         .field("version", &self.version)
         .field("label", &self.label)
         .field("applies_to", &self.applies_to)
         .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
         .finish()
    }
}

/// Constructor de pasos. `build` valida la versión; la cobertura de
/// handlers y los conflictos se validan al registrar.
pub struct MigrationStepBuilder {
    version: f64,
    label: String,
    applies_to: BTreeSet<DocumentKind>,
    handlers: BTreeMap<DocumentKind, TransformFn>,
}

impl MigrationStepBuilder {
    /// Declara el tipo y registra su handler.
    pub fn handler<F>(mut self, kind: DocumentKind, f: F) -> Self
        where F: Fn(&mut DocumentSource, Option<&DocumentSource>) -> anyhow::Result<()> + Send + Sync + 'static
    {
        self.applies_to.insert(kind);
        self.handlers.insert(kind, Arc::new(f));
        self
    }

    /// Handler para documentos de nivel superior (ignora el padre).
    pub fn document<F>(self, kind: DocumentKind, f: F) -> Self
        where F: Fn(&mut DocumentSource) -> anyhow::Result<()> + Send + Sync + 'static
    {
        self.handler(kind, move |source, _| f(source))
    }

    pub fn actor<F>(self, f: F) -> Self
        where F: Fn(&mut DocumentSource) -> anyhow::Result<()> + Send + Sync + 'static
    {
        self.document(DocumentKind::Actor, f)
    }

    /// Handler de items: el segundo argumento es el actor padre cuando el
    /// item está embebido, `None` para items sueltos.
    pub fn item<F>(self, f: F) -> Self
        where F: Fn(&mut DocumentSource, Option<&DocumentSource>) -> anyhow::Result<()> + Send + Sync + 'static
    {
        self.handler(DocumentKind::Item, f)
    }

    /// Declara el tipo sin handler. El registro rechaza el paso si nadie
    /// registra luego el handler correspondiente.
    pub fn applies_to(mut self, kind: DocumentKind) -> Self {
        self.applies_to.insert(kind);
        self
    }

    pub fn build(self) -> Result<MigrationStep> {
        if !self.version.is_finite() || self.version <= 0.0 {
            return Err(MigrationError::VersionRegistryConflict { version: self.version,
                                                                 reason: "la versión debe ser un real finito mayor que cero".into() });
        }
        let version =
            SchemaVersion::new(self.version).map_err(|e| MigrationError::VersionRegistryConflict { version: self.version,
                                                                                                  reason: e.to_string() })?;
        Ok(MigrationStep { version,
                           label: self.label,
                           applies_to: self.applies_to,
                           handlers: self.handlers })
    }
}
