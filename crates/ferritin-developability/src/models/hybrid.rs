//! Ridge and gradient-boosting blend over the preprocessed feature space.
use super::gbm::{GbmConfig, GbmRegressor};
use super::preprocess::{FittedPreprocessor, PreprocessConfig, PreprocessingChain};
use super::ridge::{RidgeConfig, RidgeRegressor};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Weight of the linear prediction in the blend; the ensemble gets the rest.
pub const BLEND_WEIGHT: f64 = 0.5;

/// Whether the tree ensemble is part of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeEnsemble {
    Enabled(GbmConfig),
    Disabled,
}

impl Default for TreeEnsemble {
    fn default() -> Self {
        Self::Enabled(GbmConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub preprocess: PreprocessConfig,
    pub ridge: RidgeConfig,
    pub ensemble: TreeEnsemble,
}

/// Ridge for the global trend blended with boosted trees for local structure.
#[derive(Debug, Clone, Default)]
pub struct HybridRegressor {
    config: HybridConfig,
}

impl HybridRegressor {
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Fits a fresh preprocessing chain and both estimators on `x`.
    ///
    /// `y` must be complete; rows with missing targets are the caller's to drop.
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FittedHybridModel> {
        if x.nrows() != y.len() {
            return Err(Error::Data(format!(
                "feature matrix has {} rows but {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if x.nrows() == 0 {
            return Err(Error::Data("cannot fit on an empty training set".to_string()));
        }
        if let Some(pos) = y.iter().position(|v| !v.is_finite()) {
            return Err(Error::Data(format!("target at row {pos} is missing")));
        }

        let mut chain = PreprocessingChain::new(self.config.preprocess);
        let z = chain.fit(x)?;
        let linear = RidgeRegressor::fit(&z, y, &self.config.ridge)?;
        let ensemble = match &self.config.ensemble {
            TreeEnsemble::Enabled(gbm) => Some(GbmRegressor::fit(&z, y, gbm)?),
            TreeEnsemble::Disabled => None,
        };
        Ok(FittedHybridModel {
            preprocessor: chain.into_fitted()?,
            linear,
            ensemble,
        })
    }
}

/// Output of [`HybridRegressor::fit`]; immutable.
#[derive(Debug, Clone)]
pub struct FittedHybridModel {
    preprocessor: FittedPreprocessor,
    linear: RidgeRegressor,
    ensemble: Option<GbmRegressor>,
}

impl FittedHybridModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let z = self.preprocessor.transform(x)?;
        let linear = self.linear.predict(&z)?;
        Ok(match &self.ensemble {
            Some(trees) => linear * BLEND_WEIGHT + trees.predict(&z) * (1.0 - BLEND_WEIGHT),
            None => linear,
        })
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn linear(&self) -> &RidgeRegressor {
        &self.linear
    }

    pub fn ensemble(&self) -> Option<&GbmRegressor> {
        self.ensemble.as_ref()
    }
}
