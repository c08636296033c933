pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod predictor;
pub mod store;

pub use config::SpecimenConfig;
pub use error::SpecimenError;
pub use models::{Label, NewPrediction, PredictionRecord};
pub use predictor::{create_predictor, PredictionError, Predictor, RandomPredictor};
pub use store::{
    create_store, MemoryPredictionStore, PgPredictionStore, PredictionStore, StoreError,
};
