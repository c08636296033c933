use thiserror::Error;

use crate::predictor::PredictionError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SpecimenError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
