//! Median imputation, standardisation and PCA, fit once on training rows.
use super::linalg::principal_axes;
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Upper bound on retained principal components.
    pub n_components: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self { n_components: 32 }
    }
}

/// Statistics captured by [`PreprocessingChain::fit`].
#[derive(Debug, Clone)]
pub struct FittedPreprocessor {
    medians: Array1<f64>,
    means: Array1<f64>,
    scales: Array1<f64>,
    /// Principal directions, one per row.
    components: Array2<f64>,
    explained_variance: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl FittedPreprocessor {
    fn fit(x: &Array2<f64>, config: &PreprocessConfig) -> Result<Self> {
        let (n, p) = x.dim();
        if n == 0 {
            return Err(Error::Data("cannot fit preprocessing on zero rows".to_string()));
        }

        let medians: Array1<f64> = x.axis_iter(Axis(1)).map(median).collect();
        let imputed = impute(x, &medians);
        let means = imputed.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let scales = imputed.std_axis(Axis(0), 0.0).mapv(|s| if s > 0.0 { s } else { 1.0 });
        let standardised = (&imputed - &means) / &scales;

        let max_axes = config.n_components.min(p).min(n);
        let axes = principal_axes(&standardised, max_axes);
        let explained_variance = axes.eigenvalues.iter().map(|l| l / n as f64).collect();
        let explained_variance_ratio = axes
            .eigenvalues
            .iter()
            .map(|l| if axes.total > 0.0 { l / axes.total } else { 0.0 })
            .collect();
        if axes.eigenvalues.len() < config.n_components {
            log::debug!(
                "retained {} of {} requested components ({} rows, {} features)",
                axes.eigenvalues.len(),
                config.n_components,
                n,
                p
            );
        }

        Ok(Self {
            medians,
            means,
            scales,
            components: axes.directions,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// Applies imputation, scaling and projection with the stored statistics.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(Error::Schema(format!(
                "preprocessor was fit on {} features, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        let standardised = (impute(x, &self.medians) - &self.means) / &self.scales;
        Ok(standardised.dot(&self.components.t()))
    }

    pub fn n_features(&self) -> usize {
        self.medians.len()
    }

    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn medians(&self) -> &Array1<f64> {
        &self.medians
    }

    pub fn components(&self) -> &Array2<f64> {
        &self.components
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

#[derive(Debug, Clone)]
enum ChainState {
    Unfit,
    Fit(FittedPreprocessor),
}

/// Imputer, scaler and reducer applied in that order.
///
/// Starts unfit. [`fit`](Self::fit) captures every statistic from the
/// training rows and returns their transformed values; afterwards
/// [`transform`](Self::transform) reuses those statistics unchanged.
#[derive(Debug, Clone)]
pub struct PreprocessingChain {
    config: PreprocessConfig,
    state: ChainState,
}

impl PreprocessingChain {
    pub fn new(config: PreprocessConfig) -> Self {
        Self {
            config,
            state: ChainState::Unfit,
        }
    }

    pub fn is_fit(&self) -> bool {
        matches!(self.state, ChainState::Fit(_))
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.is_fit() {
            return Err(Error::Config(
                "preprocessing chain is already fit; build a new one per training set".to_string(),
            ));
        }
        let fitted = FittedPreprocessor::fit(x, &self.config)?;
        let transformed = fitted.transform(x)?;
        self.state = ChainState::Fit(fitted);
        Ok(transformed)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fitted().ok_or(Error::NotFitted)?.transform(x)
    }

    pub fn fitted(&self) -> Option<&FittedPreprocessor> {
        match &self.state {
            ChainState::Fit(fitted) => Some(fitted),
            ChainState::Unfit => None,
        }
    }

    pub fn into_fitted(self) -> Result<FittedPreprocessor> {
        match self.state {
            ChainState::Fit(fitted) => Ok(fitted),
            ChainState::Unfit => Err(Error::NotFitted),
        }
    }
}

/// Median of the finite values; 0.0 when there are none.
fn median(column: ArrayView1<f64>) -> f64 {
    let mut observed: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
    if observed.is_empty() {
        return 0.0;
    }
    observed.sort_by(f64::total_cmp);
    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        (observed[mid - 1] + observed[mid]) / 2.0
    } else {
        observed[mid]
    }
}

fn impute(x: &Array2<f64>, medians: &Array1<f64>) -> Array2<f64> {
    let mut out = x.clone();
    for (mut column, &fill) in out.axis_iter_mut(Axis(1)).zip(medians.iter()) {
        column.mapv_inplace(|v| if v.is_finite() { v } else { fill });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        array![
            [1.0, f64::NAN, 3.0, 7.0],
            [2.0, 4.0, f64::NAN, 7.0],
            [3.0, 6.0, 1.0, 7.0],
            [f64::NAN, 8.0, 5.0, 7.0],
            [5.0, 2.0, 2.0, 7.0],
        ]
    }

    #[test]
    fn test_median() {
        assert_eq!(median(array![3.0, 1.0, 2.0].view()), 2.0);
        assert_eq!(median(array![4.0, 1.0, 3.0, 2.0].view()), 2.5);
        assert_eq!(median(array![f64::NAN, 1.0, 5.0].view()), 3.0);
        assert_eq!(median(array![f64::NAN, f64::NAN].view()), 0.0);
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let chain = PreprocessingChain::new(PreprocessConfig::default());
        assert!(matches!(chain.transform(&sample()), Err(Error::NotFitted)));
    }

    #[test]
    fn test_fit_then_transform_reproduces_fit_output() {
        let x = sample();
        let mut chain = PreprocessingChain::new(PreprocessConfig::default());
        let fitted = chain.fit(&x).unwrap();
        let again = chain.transform(&x).unwrap();
        assert_eq!(fitted.dim(), again.dim());
        for (a, b) in fitted.iter().zip(again.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!(fitted.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_components_capped_by_rank_and_request() {
        let x = sample();
        let mut chain = PreprocessingChain::new(PreprocessConfig::default());
        let out = chain.fit(&x).unwrap();
        // the constant column carries no variance
        assert!(out.ncols() <= 3);
        let fitted = chain.fitted().unwrap();
        let ratios = fitted.explained_variance_ratio();
        assert!(ratios.windows(2).all(|w| w[0] >= w[1]));
        assert!(ratios.iter().sum::<f64>() <= 1.0 + 1e-9);

        let mut narrow = PreprocessingChain::new(PreprocessConfig { n_components: 1 });
        assert_eq!(narrow.fit(&x).unwrap().ncols(), 1);
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let x = sample();
        let mut chain = PreprocessingChain::new(PreprocessConfig::default());
        chain.fit(&x).unwrap();
        let fitted = chain.fitted().unwrap();
        assert_eq!(fitted.medians()[0], 2.5);
        // fully missing row is filled from the training medians
        let row = array![[f64::NAN, f64::NAN, f64::NAN, f64::NAN]];
        let out = chain.transform(&row).unwrap();
        assert_eq!(out.ncols(), fitted.n_components());
        assert!(out.iter().all(|v| v.is_finite()));
        assert!(matches!(
            chain.transform(&array![[1.0, 2.0]]),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_refit_is_rejected() {
        let mut chain = PreprocessingChain::new(PreprocessConfig::default());
        chain.fit(&sample()).unwrap();
        assert!(matches!(chain.fit(&sample()), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_training_set() {
        let mut chain = PreprocessingChain::new(PreprocessConfig::default());
        assert!(matches!(chain.fit(&Array2::zeros((0, 3))), Err(Error::Data(_))));
    }
}
