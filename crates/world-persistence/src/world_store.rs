use crate::errors::{Result, StoreError};
use crate::schema;
use crate::schema::documents::dsl as docs;
use crate::schema::world_settings::dsl as settings;
use async_trait::async_trait;
use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, info};
use migration::{CorpusLoader, MigrationError, PersistError, Persister};
use std::sync::Arc;
use world_domain::{Document, DocumentKind, DocumentSource, SchemaVersion, World};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Ajuste con el identificador del mundo.
pub const WORLD_ID_SETTING: &str = "world.id";
/// Ajuste con la versión de esquema estampada en el mundo.
pub const WORLD_VERSION_SETTING: &str = "world.schemaVersion";
const DEFAULT_WORLD_ID: &str = "world";
const DEFAULT_DB_URL: &str = "world.sqlite3";

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::documents)]
struct DocumentRow {
  pub kind: String,
  pub id: String,
  pub position: i64,
  pub source: String,
  pub schema_version: f64,
  pub updated_at_ts: i64,
}

impl DocumentRow {
  fn new(kind: DocumentKind, id: &str, position: i64, source: &DocumentSource) -> Result<Self> {
    Ok(Self { kind: kind.as_str().to_string(),
              id: id.to_string(),
              position,
              source: serde_json::to_string(source)?,
              schema_version: source.schema_version()?.value(),
              updated_at_ts: Utc::now().timestamp_millis() })
  }

  fn into_document(self, kind: DocumentKind) -> Result<Document> {
    Ok(Document::from_value(kind, serde_json::from_str(&self.source)?)?)
  }
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = schema::world_settings)]
struct SettingRow {
  pub key: String,
  pub value: String,
}

/// Pragmas aplicados a cada conexión que entrega el pool.
#[derive(Debug)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
  fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
    conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;")
        .map_err(diesel::r2d2::Error::QueryError)?;
    Ok(())
  }
}

/// Almacenamiento de un mundo en SQLite.
///
/// Cada documento de nivel superior es una fila de `documents` con su
/// fuente JSON completa (los items embebidos viajan dentro del actor). La
/// versión del mundo vive en `world_settings`. Implementa `CorpusLoader` y
/// `Persister`, así que sirve directamente al `MigrationService`.
#[derive(Clone)]
pub struct DieselWorldStore {
  pool: Arc<DbPool>,
}

impl DieselWorldStore {
  pub fn new(database_url: &str) -> Result<Self> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().max_size(4)
                              .connection_customizer(Box::new(SqlitePragmas))
                              .build(manager)?;
    let store = DieselWorldStore { pool: Arc::new(pool) };
    let mut conn = store.conn()?;
    conn.run_pending_migrations(MIGRATIONS).map_err(|e| StoreError::Schema(e.to_string()))?;
    debug!("almacenamiento abierto en {}", database_url);
    Ok(store)
  }

  fn conn(&self) -> Result<PooledConnection<ConnectionManager<SqliteConnection>>> {
    Ok(self.pool.get()?)
  }

  /// Reemplaza todo el contenido por `world`. Devuelve cuántos documentos
  /// se escribieron.
  pub fn import_world(&self, world: &World) -> Result<usize> {
    let mut conn = self.conn()?;
    let written = conn.transaction::<_, StoreError, _>(|conn| {
                        diesel::delete(docs::documents).execute(conn)?;
                        let mut written = 0;
                        for kind in DocumentKind::MIGRATION_ORDER {
                          for (position, doc) in world.documents(kind).enumerate() {
                            let row = DocumentRow::new(kind, doc.id(), position as i64, doc.source())?;
                            diesel::insert_into(docs::documents).values(&row).execute(conn)?;
                            written += 1;
                          }
                        }
                        put_setting(conn, WORLD_ID_SETTING, world.id())?;
                        put_setting(conn, WORLD_VERSION_SETTING, &world.schema_version().to_json().to_string())?;
                        Ok(written)
                      })?;
    info!("mundo {} importado: {} documentos", world.id(), written);
    Ok(written)
  }

  /// Carga el mundo completo respetando el orden de importación.
  pub fn load(&self) -> Result<World> {
    let mut conn = self.conn()?;
    let world_id = get_setting(&mut conn, WORLD_ID_SETTING)?.unwrap_or_else(|| DEFAULT_WORLD_ID.to_string());
    let mut world = World::new(world_id, read_version(&mut conn)?);
    for kind in DocumentKind::MIGRATION_ORDER {
      let rows = docs::documents.filter(docs::kind.eq(kind.as_str()))
                                .order(docs::position.asc())
                                .load::<DocumentRow>(&mut conn)?;
      for row in rows {
        world.insert(row.into_document(kind)?)?;
      }
    }
    Ok(world)
  }

  pub fn get_document(&self, kind: DocumentKind, id: &str) -> Result<Option<Document>> {
    let mut conn = self.conn()?;
    let row = docs::documents.filter(docs::kind.eq(kind.as_str()))
                             .filter(docs::id.eq(id))
                             .first::<DocumentRow>(&mut conn)
                             .optional()?;
    row.map(|r| r.into_document(kind)).transpose()
  }

  /// Escribe la fuente de un documento. Un documento existente conserva su
  /// posición; uno nuevo va al final de su colección.
  pub fn upsert_document(&self, kind: DocumentKind, id: &str, source: &DocumentSource) -> Result<()> {
    let mut conn = self.conn()?;
    conn.transaction::<_, StoreError, _>(|conn| {
          let row = DocumentRow::new(kind, id, 0, source)?;
          let updated = diesel::update(docs::documents.filter(docs::kind.eq(&row.kind)).filter(docs::id.eq(&row.id)))
            .set((docs::source.eq(&row.source),
                  docs::schema_version.eq(row.schema_version),
                  docs::updated_at_ts.eq(row.updated_at_ts)))
            .execute(conn)?;
          if updated == 0 {
            let last: Option<i64> = docs::documents.filter(docs::kind.eq(&row.kind))
                                                   .select(diesel::dsl::max(docs::position))
                                                   .first(conn)?;
            let row = DocumentRow { position: last.map_or(0, |p| p + 1),
                                    ..row };
            diesel::insert_into(docs::documents).values(&row).execute(conn)?;
          }
          Ok(())
        })
  }

  pub fn world_version(&self) -> Result<SchemaVersion> {
    let mut conn = self.conn()?;
    read_version(&mut conn)
  }

  pub fn set_world_version(&self, version: SchemaVersion) -> Result<()> {
    let mut conn = self.conn()?;
    put_setting(&mut conn, WORLD_VERSION_SETTING, &version.to_json().to_string())
  }

  pub fn document_count(&self) -> Result<i64> {
    let mut conn = self.conn()?;
    Ok(docs::documents.count().get_result(&mut conn)?)
  }

  async fn blocking<T, F>(&self, f: F) -> Result<T>
    where T: Send + 'static,
          F: FnOnce(DieselWorldStore) -> Result<T> + Send + 'static
  {
    let store = self.clone();
    tokio::task::spawn_blocking(move || f(store)).await
                                                  .map_err(|e| StoreError::Join(e.to_string()))?
  }
}

fn put_setting(conn: &mut SqliteConnection, key: &str, value: &str) -> Result<()> {
  let row = SettingRow { key: key.to_string(),
                         value: value.to_string() };
  diesel::replace_into(settings::world_settings).values(&row).execute(conn)?;
  Ok(())
}

fn get_setting(conn: &mut SqliteConnection, key: &str) -> Result<Option<String>> {
  Ok(settings::world_settings.filter(settings::key.eq(key))
                             .select(settings::value)
                             .first::<String>(conn)
                             .optional()?)
}

fn read_version(conn: &mut SqliteConnection) -> Result<SchemaVersion> {
  match get_setting(conn, WORLD_VERSION_SETTING)? {
    Some(raw) => Ok(SchemaVersion::from_json(&serde_json::from_str(&raw)?)?),
    None => Ok(SchemaVersion::ZERO),
  }
}

#[async_trait]
impl CorpusLoader for DieselWorldStore {
  async fn load_world(&self) -> migration::Result<World> {
    self.blocking(|store| store.load()).await.map_err(|e| MigrationError::Load(e.to_string()))
  }
}

#[async_trait]
impl Persister for DieselWorldStore {
  async fn commit(&self, kind: DocumentKind, document_id: &str, source: &DocumentSource) -> std::result::Result<(), PersistError> {
    let id = document_id.to_string();
    let source = source.clone();
    self.blocking(move |store| store.upsert_document(kind, &id, &source))
        .await
        .map_err(|e| PersistError::new(Some(kind), document_id, e.to_string()))
  }

  async fn stamp_world_version(&self, version: SchemaVersion) -> std::result::Result<(), PersistError> {
    self.blocking(move |store| store.set_world_version(version))
        .await
        .map_err(|e| PersistError::new(None, WORLD_VERSION_SETTING, e.to_string()))
  }
}

/// Abre el almacenamiento indicado por `WORLD_DB_URL` (o `DATABASE_URL`);
/// por defecto `world.sqlite3` en el directorio actual.
pub fn new_from_env() -> Result<DieselWorldStore> {
  dotenvy::dotenv().ok();
  let url = std::env::var("WORLD_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                         .unwrap_or_else(|_| DEFAULT_DB_URL.into());
  DieselWorldStore::new(&url)
}
