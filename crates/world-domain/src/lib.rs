//! world-domain: documentos crudos de un mundo y sus versiones de esquema.
//!
//! Los registros persistidos (actores, items, usuarios, tablas, diarios,
//! macros, ajustes) se modelan como árboles JSON opacos (`DocumentSource`)
//! porque su forma está desfasada respecto al esquema actual. Este crate no
//! conoce ningún paso de migración: sólo sabe leer y estampar versiones.
mod document;
mod errors;
mod export;
mod kind;
mod source;
mod version;
mod world;
mod world_stubs;

pub use document::Document;
pub use errors::{DocumentError, Result};
pub use export::WorldExport;
pub use kind::DocumentKind;
pub use source::{DocumentSource, EMBEDDED_ITEMS_KEY, ID_KEY, SCHEMA_VERSION_KEY, TYPE_KEY};
pub use version::SchemaVersion;
pub use world::World;
pub use world_stubs::WorldStubs;
