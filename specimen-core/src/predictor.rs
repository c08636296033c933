//! Image classifiers.
//!
//! A `Predictor` maps raw upload bytes to a [`Label`]. The HTTP layer only
//! knows the trait, so a real model can replace the bundled placeholder
//! without touching the serving code.
//!
//! Backends:
//! - **random** — uniform pick over [`Label::ALL`], ignores its input.
//!   Seedable for reproducible runs.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::config::PredictorConfig;
use crate::models::Label;

/// Abstraction over classifiers.
///
/// Implementations must be total over byte input: empty or undecodable
/// images either yield a label or an `Err`, never a panic and never a value
/// outside the label set.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, image: &[u8]) -> Result<Label, PredictionError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unknown predictor backend: {0}")]
    UnknownBackend(String),
}

/// Build the predictor named by `predictor.backend`.
pub fn create_predictor(config: &PredictorConfig) -> Result<Box<dyn Predictor>, PredictionError> {
    match config.backend.as_str() {
        "random" => Ok(Box::new(match config.seed {
            Some(seed) => RandomPredictor::seeded(seed),
            None => RandomPredictor::new(),
        })),
        other => Err(PredictionError::UnknownBackend(other.to_string())),
    }
}

/// Placeholder classifier: a uniform random label regardless of content.
pub struct RandomPredictor {
    rng: Mutex<StdRng>,
}

impl RandomPredictor {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPredictor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Predictor for RandomPredictor {
    async fn predict(&self, image: &[u8]) -> Result<Label, PredictionError> {
        tracing::debug!(bytes = image.len(), "Running placeholder prediction");

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| PredictionError::Inference("rng lock poisoned".to_string()))?;

        Label::ALL
            .choose(&mut *rng)
            .copied()
            .ok_or_else(|| PredictionError::Inference("empty label set".to_string()))
    }

    fn name(&self) -> &str {
        "random"
    }
}
