pub mod label;
pub mod prediction;

pub use label::{Label, UnknownLabel};
pub use prediction::{NewPrediction, PredictionRecord};
