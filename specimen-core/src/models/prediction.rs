use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::label::Label;

/// One logged inference. Immutable once the store has assigned its `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    #[sqlx(try_from = "String")]
    pub prediction: Label,
}

/// Store input: everything but the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrediction {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub prediction: Label,
}

impl NewPrediction {
    /// Stamp a fresh prediction with the current server time.
    pub fn now(filename: impl Into<String>, prediction: Label) -> Self {
        Self {
            timestamp: Utc::now(),
            filename: filename.into(),
            prediction,
        }
    }
}
