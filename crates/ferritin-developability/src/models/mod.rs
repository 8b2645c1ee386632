//! Preprocessing and regressors.
pub mod gbm;
mod hybrid;
pub mod linalg;
pub mod preprocess;
pub mod ridge;

pub use gbm::{GbmConfig, GbmRegressor};
pub use hybrid::{FittedHybridModel, HybridConfig, HybridRegressor, TreeEnsemble, BLEND_WEIGHT};
pub use preprocess::{FittedPreprocessor, PreprocessConfig, PreprocessingChain};
pub use ridge::{RidgeConfig, RidgeRegressor};
