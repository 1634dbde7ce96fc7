// Archivo: config.rs
// Propósito: configuración del runner (desde variables de entorno) y
// opciones de cada corrida.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use world_domain::SchemaVersion;

/// Configuración del `MigrationRunner`.
///
/// - `parallel`: aplica cada paso a los documentos de un tipo en paralelo
///   (rayon). Con `false` se recorren en orden, útil para depurar.
/// - `persist_retry_backoff`: espera antes del único reintento de escritura.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub parallel: bool,
    pub persist_retry_backoff: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { parallel: true,
               persist_retry_backoff: Duration::from_millis(50) }
    }
}

impl RunnerConfig {
    /// Lee `MIGRATION_PARALLEL` y `MIGRATION_RETRY_BACKOFF_MS` (carga
    /// `.env` si existe). Valores ilegibles se ignoran.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("MIGRATION_PARALLEL") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "0" | "false" | "no" | "off" => config.parallel = false,
                "1" | "true" | "yes" | "on" => config.parallel = true,
                other => log::warn!("MIGRATION_PARALLEL inválido: {}", other),
            }
        }
        if let Ok(raw) = std::env::var("MIGRATION_RETRY_BACKOFF_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.persist_retry_backoff = Duration::from_millis(ms),
                Err(_) => log::warn!("MIGRATION_RETRY_BACKOFF_MS inválido: {}", raw),
            }
        }
        config
    }

    pub fn sequential() -> Self {
        Self { parallel: false,
               ..Self::default() }
    }
}

/// Bandera de cancelación cooperativa. Sólo se consulta entre pasos.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Opciones de una corrida.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Versión objetivo; `None` migra hasta la última registrada.
    pub target: Option<SchemaVersion>,
    pub dry_run: bool,
    pub cancel: CancelFlag,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Option<SchemaVersion>) -> Self {
        self.target = target;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}
