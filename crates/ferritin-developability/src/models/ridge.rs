//! Ridge regression with leave-one-out selection of the penalty.
use super::linalg::symmetric_eigen;
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RidgeConfig {
    /// Candidate penalty strengths.
    pub alphas: Vec<f64>,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            alphas: vec![1e-3, 1e-2, 1e-1, 1.0, 1e1, 1e2, 1e3],
        }
    }
}

impl RidgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.alphas.is_empty() {
            return Err(Error::Config("ridge needs at least one alpha".to_string()));
        }
        if let Some(bad) = self.alphas.iter().find(|a| !(a.is_finite() && **a > 0.0)) {
            return Err(Error::Config(format!("ridge alpha must be positive, got {bad}")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RidgeRegressor {
    coefficients: Array1<f64>,
    intercept: f64,
    alpha: f64,
}

impl RidgeRegressor {
    /// Fits on centred data and keeps the alpha with the lowest exact
    /// leave-one-out squared error. Ties go to the smaller alpha.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &RidgeConfig) -> Result<Self> {
        config.validate()?;
        let (n, k) = x.dim();
        if n == 0 {
            return Err(Error::Data("cannot fit ridge on zero rows".to_string()));
        }
        if y.len() != n {
            return Err(Error::Data(format!("{n} rows but {} targets", y.len())));
        }

        let y_mean = y.sum() / n as f64;
        let x_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(k));
        let mut alphas = config.alphas.clone();
        alphas.sort_by(f64::total_cmp);

        if k == 0 {
            return Ok(Self {
                coefficients: Array1::zeros(0),
                intercept: y_mean,
                alpha: alphas[0],
            });
        }

        let xc = x - &x_mean;
        let yc = y - y_mean;
        let (lambdas, q) = symmetric_eigen(&xc.t().dot(&xc));
        let lambdas = lambdas.mapv(|l| l.max(0.0));
        // rotated design and response
        let u = xc.dot(&q);
        let uty = u.t().dot(&yc);

        let solve = |alpha: f64| -> Array1<f64> {
            let shrunk = &uty / &(&lambdas + alpha);
            q.dot(&shrunk)
        };

        let mut best = (alphas[0], f64::INFINITY);
        if n < 2 {
            log::debug!("single training row; using alpha {}", best.0);
        } else {
            for &alpha in &alphas {
                let beta = solve(alpha);
                let residuals = &yc - &xc.dot(&beta);
                let hat = u.mapv(|v| v * v).dot(&(&lambdas + alpha).mapv(f64::recip)) + 1.0 / n as f64;
                let loo = residuals
                    .iter()
                    .zip(hat.iter())
                    .map(|(e, h)| {
                        let leverage = 1.0 - h;
                        let r = if leverage.abs() > 1e-12 { e / leverage } else { *e };
                        r * r
                    })
                    .sum::<f64>()
                    / n as f64;
                if loo < best.1 {
                    best = (alpha, loo);
                }
            }
            log::debug!("ridge selected alpha {} (loo mse {:.4})", best.0, best.1);
        }

        let coefficients = solve(best.0);
        let intercept = y_mean - x_mean.dot(&coefficients);
        Ok(Self {
            coefficients,
            intercept,
            alpha: best.0,
        })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(Error::Schema(format!(
                "ridge was fit on {} features, got {}",
                self.coefficients.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }
}
