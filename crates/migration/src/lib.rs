//! Crate `migration`: motor de migración versionada de documentos.
//!
//! Un `MigrationRegistry` guarda pasos (`MigrationStep`) ordenados por
//! versión; cada paso trae un handler por tipo de documento. El
//! `MigrationRunner` recorre un `World` tipo por tipo y aplica, paso a paso,
//! los handlers a todo documento cuyo estampado (`schemaVersion`) sea menor
//! que la versión del paso. Los actores se migran junto con sus items
//! embebidos.
//!
//! Diseño resumido:
//! - Idempotencia: el estampado de cada documento decide si un paso corre;
//!   relanzar una corrida sobre un corpus migrado no invoca handlers.
//! - Aislamiento: un handler que falla deja su documento congelado en el
//!   último estampado válido y no afecta a los demás.
//! - Dry-run: mismos desenlaces, pero los cambios van a un `ReportSink`.
//!
//! Ejemplo rápido:
//! ```rust
//! use migration::{MigrationRegistry, MigrationService, MigrationStep, RunnerConfig};
//! use migration::stubs::InMemoryWorldStore;
//! use std::sync::Arc;
//! use world_domain::{SchemaVersion, World};
//!
//! let step = MigrationStep::builder(1.0, "marca").actor(|src| {
//!                                                      src.insert("migrated", serde_json::json!(true));
//!                                                      Ok(())
//!                                                  })
//!                                                 .build()
//!                                                 .unwrap();
//! let registry = Arc::new(MigrationRegistry::from_steps(vec![step]).unwrap());
//! let store = Arc::new(InMemoryWorldStore::new(World::new("demo", SchemaVersion::ZERO)));
//! let service = MigrationService::new(store, registry, RunnerConfig::default());
//! let summary = tokio_test::block_on(service.migrate(None, false)).unwrap();
//! assert!(summary.world_stamped);
//! ```
pub mod collector;
pub mod config;
pub mod domain;
pub mod errors;
pub mod persister;
pub mod registry;
pub mod runner;
pub mod service;
pub mod step;
pub mod stubs;
pub mod updater;

pub use collector::*;
pub use config::*;
pub use domain::*;
pub use errors::*;
pub use persister::*;
pub use registry::*;
pub use runner::*;
pub use service::*;
pub use step::*;
pub use updater::*;
