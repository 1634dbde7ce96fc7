// Archivo: registry.rs
// Propósito: colección ordenada de pasos de migración. Valida al registrar
// y responde qué pasos aplican a un tipo entre dos versiones.
use crate::errors::{MigrationError, Result};
use crate::step::MigrationStep;
use log::debug;
use world_domain::{DocumentKind, SchemaVersion};

/// Pasos ordenados por versión ascendente.
///
/// Dos pasos pueden compartir versión sólo si sus tipos no comparten
/// unidad de migración (ver `DocumentKind::shares_unit_with`).
#[derive(Debug, Default, Clone)]
pub struct MigrationRegistry {
    steps: Vec<MigrationStep>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps<I>(steps: I) -> Result<Self>
        where I: IntoIterator<Item = MigrationStep>
    {
        let mut registry = Self::new();
        for step in steps {
            registry.register(step)?;
        }
        Ok(registry)
    }

    /// Registra un paso manteniendo el orden por versión.
    ///
    /// Falla con `StepHandlerMissing` si algún tipo declarado no tiene
    /// handler y con `VersionRegistryConflict` si el paso no declara tipos
    /// o choca con otro de la misma versión.
    pub fn register(&mut self, step: MigrationStep) -> Result<()> {
        let version = step.version().value();
        if step.applies_to().is_empty() {
            return Err(MigrationError::VersionRegistryConflict { version,
                                                                 reason: format!("el paso `{}` no declara tipos", step.label()) });
        }
        if let Some(kind) = step.applies_to().iter().find(|k| step.handler(**k).is_none()) {
            return Err(MigrationError::StepHandlerMissing { version, kind: *kind });
        }
        for existing in self.steps.iter().filter(|s| s.version() == step.version()) {
            let clash = step.applies_to()
                            .iter()
                            .find(|k| existing.applies_to().iter().any(|e| e.shares_unit_with(**k)));
            if let Some(kind) = clash {
                return Err(MigrationError::VersionRegistryConflict { version,
                                                                     reason: format!("`{}` y `{}` comparten la unidad `{}`",
                                                                                     existing.label(),
                                                                                     step.label(),
                                                                                     kind) });
            }
        }
        debug!("registrado paso {} `{}` para {:?}", step.version(), step.label(), step.applies_to());
        let pos = self.steps.partition_point(|s| s.version() <= step.version());
        self.steps.insert(pos, step);
        Ok(())
    }

    /// Pasos que declaran `kind` con versión estrictamente mayor a `version`.
    pub fn steps_above(&self, version: SchemaVersion, kind: DocumentKind) -> Vec<&MigrationStep> {
        self.steps.iter().filter(|s| s.version() > version && s.declares(kind)).collect()
    }

    /// Pasos que declaran `kind` en el intervalo `(from, to]`.
    pub fn steps_between(&self, from: SchemaVersion, to: SchemaVersion, kind: DocumentKind) -> Vec<&MigrationStep> {
        self.steps
            .iter()
            .filter(|s| s.version() > from && s.version() <= to && s.declares(kind))
            .collect()
    }

    /// Como `steps_between` pero por unidad: para actores incluye los pasos
    /// de items, que se aplican a sus items embebidos.
    pub fn unit_steps(&self, from: SchemaVersion, to: SchemaVersion, kind: DocumentKind) -> Vec<&MigrationStep> {
        self.steps
            .iter()
            .filter(|s| s.version() > from && s.version() <= to && s.touches_unit(kind))
            .collect()
    }

    /// Mayor versión registrada, cero si el registro está vacío.
    pub fn latest_version(&self) -> SchemaVersion {
        self.steps.last().map(|s| s.version()).unwrap_or(SchemaVersion::ZERO)
    }

    /// Versiones registradas, ascendentes y sin repetir.
    pub fn versions(&self) -> Vec<SchemaVersion> {
        let mut versions: Vec<SchemaVersion> = self.steps.iter().map(|s| s.version()).collect();
        versions.dedup();
        versions
    }

    pub fn contains_version(&self, version: SchemaVersion) -> bool {
        self.steps.iter().any(|s| s.version() == version)
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(version: f64, kind: DocumentKind) -> MigrationStep {
        MigrationStep::builder(version, format!("{}-{}", kind, version)).document(kind, |_| Ok(()))
                                                                        .build()
                                                                        .unwrap()
    }

    fn v(value: f64) -> SchemaVersion {
        SchemaVersion::new(value).unwrap()
    }

    #[test]
    fn keeps_steps_sorted_regardless_of_registration_order() {
        let registry = MigrationRegistry::from_steps(vec![step(2.0, DocumentKind::Actor),
                                                          step(0.5, DocumentKind::Actor),
                                                          step(1.0, DocumentKind::Macro)]).unwrap();
        let versions: Vec<f64> = registry.steps().iter().map(|s| s.version().value()).collect();
        assert_eq!(versions, vec![0.5, 1.0, 2.0]);
        assert_eq!(registry.latest_version(), v(2.0));
    }

    #[test]
    fn same_version_is_allowed_for_disjoint_units() {
        let mut registry = MigrationRegistry::new();
        registry.register(step(1.0, DocumentKind::User)).unwrap();
        registry.register(step(1.0, DocumentKind::Macro)).unwrap();
        let err = registry.register(step(1.0, DocumentKind::User)).unwrap_err();
        assert!(matches!(err, MigrationError::VersionRegistryConflict { .. }));
        registry.register(step(2.0, DocumentKind::Actor)).unwrap();
        let err = registry.register(step(2.0, DocumentKind::Item)).unwrap_err();
        assert!(matches!(err, MigrationError::VersionRegistryConflict { .. }));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.versions(), vec![v(1.0), v(2.0)]);
    }

    #[test]
    fn declared_kind_without_handler_is_rejected() {
        let bad = MigrationStep::builder(1.0, "incompleto").actor(|_| Ok(()))
                                                          .applies_to(DocumentKind::Item)
                                                          .build()
                                                          .unwrap();
        let err = MigrationRegistry::new().register(bad).unwrap_err();
        assert!(matches!(err, MigrationError::StepHandlerMissing { kind: DocumentKind::Item, .. }));
    }

    #[test]
    fn queries_filter_by_kind_and_interval() {
        let item_step = MigrationStep::builder(1.5, "items").item(|_, _| Ok(())).build().unwrap();
        let registry = MigrationRegistry::from_steps(vec![step(1.0, DocumentKind::Actor),
                                                          item_step,
                                                          step(2.0, DocumentKind::Actor),
                                                          step(3.0, DocumentKind::Actor)]).unwrap();
        let above: Vec<f64> = registry.steps_above(v(1.0), DocumentKind::Actor)
                                      .iter()
                                      .map(|s| s.version().value())
                                      .collect();
        assert_eq!(above, vec![2.0, 3.0]);
        let between: Vec<f64> = registry.steps_between(SchemaVersion::ZERO, v(2.0), DocumentKind::Actor)
                                        .iter()
                                        .map(|s| s.version().value())
                                        .collect();
        assert_eq!(between, vec![1.0, 2.0]);
        let unit: Vec<f64> = registry.unit_steps(SchemaVersion::ZERO, v(2.0), DocumentKind::Actor)
                                     .iter()
                                     .map(|s| s.version().value())
                                     .collect();
        assert_eq!(unit, vec![1.0, 1.5, 2.0]);
        assert!(registry.steps_above(v(3.0), DocumentKind::Actor).is_empty());
    }
}
