//! Prediction log storage.
//!
//! Provides a `PredictionStore` trait with implementations for:
//! - **Postgres** — the `predictions` table behind a managed `PgPool`
//! - **Memory** — a process-local log for database-less deployments and tests

use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::config::{SpecimenConfig, StoreBackend};
use crate::models::{NewPrediction, PredictionRecord};

// ============================================================================
// PredictionStore trait
// ============================================================================

/// Durable, append-only log of predictions.
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Persist one record and return it with its assigned id. Atomic: a
    /// failed insert leaves nothing visible to `list_all`.
    async fn insert(&self, input: NewPrediction) -> Result<PredictionRecord, StoreError>;

    /// Every record, newest `timestamp` first. Equal timestamps fall back
    /// to descending id.
    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError>;

    /// Cheap reachability probe for health checks. Returns a short
    /// description of the backend (e.g. the server version).
    async fn ping(&self) -> Result<String, StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Factory
// ============================================================================

/// Create the store selected by `store.backend`. The Postgres backend
/// connects eagerly so misconfiguration surfaces at startup.
pub async fn create_store(config: &SpecimenConfig) -> Result<Box<dyn PredictionStore>, StoreError> {
    match config.store.backend {
        StoreBackend::Postgres => {
            let pool = crate::db::create_pool(&config.database).await?;
            Ok(Box::new(PgPredictionStore::new(
                pool,
                config.database.operation_timeout(),
            )))
        }
        StoreBackend::Memory => Ok(Box::new(MemoryPredictionStore::new())),
    }
}

// ============================================================================
// PgPredictionStore
// ============================================================================

const INSERT_SQL: &str = r#"
    INSERT INTO predictions (timestamp, filename, prediction)
    VALUES ($1, $2, $3)
    RETURNING id, timestamp, filename, prediction
"#;

const LIST_SQL: &str = r#"
    SELECT id, timestamp, filename, prediction
    FROM predictions
    ORDER BY timestamp DESC, id DESC
"#;

/// Postgres-backed store. Each query checks a connection out of the pool
/// and returns it when the query future completes or is dropped.
#[derive(Debug, Clone)]
pub struct PgPredictionStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgPredictionStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                operation,
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[async_trait]
impl PredictionStore for PgPredictionStore {
    async fn insert(&self, input: NewPrediction) -> Result<PredictionRecord, StoreError> {
        let query = sqlx::query_as::<_, PredictionRecord>(INSERT_SQL)
            .bind(input.timestamp)
            .bind(input.filename)
            .bind(input.prediction.as_str())
            .fetch_one(&self.pool);

        self.bounded("insert", query).await
    }

    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let query = sqlx::query_as::<_, PredictionRecord>(LIST_SQL).fetch_all(&self.pool);
        self.bounded("list_all", query).await
    }

    async fn ping(&self) -> Result<String, StoreError> {
        self.bounded("ping", crate::db::health_check(&self.pool)).await
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

// ============================================================================
// MemoryPredictionStore
// ============================================================================

#[derive(Debug, Default)]
struct MemoryLog {
    last_id: i64,
    records: Vec<PredictionRecord>,
}

/// In-process store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryPredictionStore {
    log: RwLock<MemoryLog>,
}

impl MemoryPredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.log.read().map(|log| log.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl PredictionStore for MemoryPredictionStore {
    async fn insert(&self, input: NewPrediction) -> Result<PredictionRecord, StoreError> {
        let mut log = self.log.write().map_err(poisoned)?;
        log.last_id += 1;

        let record = PredictionRecord {
            id: log.last_id,
            timestamp: input.timestamp,
            filename: input.filename,
            prediction: input.prediction,
        };
        log.records.push(record.clone());

        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
        let mut records = self.log.read().map_err(poisoned)?.records.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn ping(&self) -> Result<String, StoreError> {
        let count = self.log.read().map_err(poisoned)?.records.len();
        Ok(format!("in-memory ({} records)", count))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Tests
// ============================================================================
