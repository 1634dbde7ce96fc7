//! world-migrations: catálogo de pasos de migración del sistema de juego
//!
//! Cada versión publicada del esquema es un `ReleaseStep` que construye un
//! `migration::MigrationStep` con los handlers de los tipos que toca. El
//! catálogo los registra en un `MigrationRegistry` listo para el runner.

pub mod catalog;
pub mod errors;
pub mod step;
pub mod steps;

pub use catalog::{catalog, release_steps, shared_registry};
pub use errors::CatalogError;
pub use step::ReleaseStep;
