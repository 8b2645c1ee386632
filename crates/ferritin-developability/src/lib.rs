//! ferritin-developability
//!
//! Predicts antibody developability properties (hydrophobic interaction,
//! self-association, polyreactivity, thermal stability, titer) from paired
//! VH/VL sequences.
//!
//! - [`features`]: sequence summaries, CDR features and the fixed-order feature matrix
//! - [`models`]: median imputation, scaling and PCA, ridge, boosted trees and their blend
//! - [`cv`]: leave-one-group-out evaluation on pre-assigned folds
//! - [`pipeline`]: cross-validation and train/predict runs over many properties
//!
//! Embedding models and CDR numbering are collaborators behind the [`Embedder`]
//! and [`CdrExtractor`] traits.
pub mod cv;
mod embedding;
mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod pipeline;
mod record;

pub use cv::{CrossValidator, CvResult, FoldAssignment, FoldLabel, FoldScore};
pub use embedding::{CompositionEmbedder, Embedder};
pub use error::{Error, Result};
pub use features::{AhoCdrExtractor, CdrExtractor, Chain, FeatureMatrix, FeatureSchema};
pub use models::{FittedHybridModel, HybridConfig, HybridRegressor, TreeEnsemble};
pub use pipeline::{
    cross_validate, train_and_predict, CvReport, PipelineConfig, PredictionReport,
    PropertyPredictions,
};
pub use record::AntibodyRecord;
