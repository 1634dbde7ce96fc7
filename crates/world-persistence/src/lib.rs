//! Persistencia SQLite (Diesel) de un mundo: implementa los contratos
//! `CorpusLoader` y `Persister` del motor de migraciones. El detalle está
//! en `world_store.rs`.

mod errors;
pub mod schema;
mod world_store;

pub use errors::{Result, StoreError};
pub use world_store::{new_from_env, DieselWorldStore, MIGRATIONS, WORLD_ID_SETTING, WORLD_VERSION_SETTING};
