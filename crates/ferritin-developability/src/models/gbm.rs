//! Gradient-boosted regression trees for squared error.
//!
//! Each round fits one depth-bounded tree to the current residual gradients
//! on a random subset of rows and columns, then adds its learning-rate-scaled
//! output to the running prediction. Splits are found by exact greedy search
//! over sorted feature values with the usual second-order gain.
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) for each tree.
    pub subsample: f64,
    /// Fraction of columns drawn for each tree.
    pub colsample_bytree: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// Minimum hessian sum on each side of a split.
    pub min_child_weight: f64,
    pub seed: u64,
}

impl Default for GbmConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 4,
            learning_rate: 0.05,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
            seed: 0,
        }
    }
}

impl GbmConfig {
    pub fn validate(&self) -> Result<()> {
        let fraction = |v: f64| v > 0.0 && v <= 1.0;
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !fraction(self.subsample) || !fraction(self.colsample_bytree) {
            return Err(Error::Config(format!(
                "subsample ({}) and colsample_bytree ({}) must lie in (0, 1]",
                self.subsample, self.colsample_bytree
            )));
        }
        if self.reg_lambda < 0.0 || self.min_child_weight < 0.0 {
            return Err(Error::Config(
                "reg_lambda and min_child_weight must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    gradients: &'a [f64],
    columns: &'a [usize],
    config: &'a GbmConfig,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    /// Hessians are all 1 for squared error, so H is the row count.
    fn grow(&mut self, rows: &[usize], depth: usize) -> usize {
        let g: f64 = rows.iter().map(|&i| self.gradients[i]).sum();
        let h = rows.len() as f64;
        let node = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: -g / (h + self.config.reg_lambda) * self.config.learning_rate,
        });
        if depth >= self.config.max_depth || rows.len() < 2 {
            return node;
        }
        let Some(split) = self.best_split(rows, g, h) else {
            return node;
        };
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);
        let left = self.grow(&left_rows, depth + 1);
        let right = self.grow(&right_rows, depth + 1);
        self.nodes[node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let lambda = self.config.reg_lambda;
        let score = |g: f64, h: f64| g * g / (h + lambda);
        let parent = score(g, h);
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();

        for &feature in self.columns {
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));
            let mut g_left = 0.0;
            for (pos, pair) in sorted.windows(2).enumerate() {
                g_left += self.gradients[pair[0]];
                let h_left = (pos + 1) as f64;
                let h_right = h - h_left;
                let (lo, hi) = (self.x[[pair[0], feature]], self.x[[pair[1], feature]]);
                if lo == hi
                    || h_left < self.config.min_child_weight
                    || h_right < self.config.min_child_weight
                {
                    continue;
                }
                let gain = 0.5 * (score(g_left, h_left) + score(g - g_left, h_right) - parent);
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
pub struct GbmRegressor {
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl GbmRegressor {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &GbmConfig) -> Result<Self> {
        config.validate()?;
        let (n, k) = x.dim();
        if n == 0 {
            return Err(Error::Data("cannot fit trees on zero rows".to_string()));
        }
        if y.len() != n {
            return Err(Error::Data(format!("{n} rows but {} targets", y.len())));
        }

        let base_score = y.sum() / n as f64;
        if k == 0 {
            log::debug!("no features to split on; boosting reduces to the base score");
            return Ok(Self {
                base_score,
                trees: Vec::new(),
            });
        }
        let mut prediction = vec![base_score; n];
        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let n_rows = sample_size(n, config.subsample);
        let n_cols = sample_size(k, config.colsample_bytree);

        for _ in 0..config.n_estimators {
            let gradients: Vec<f64> = prediction.iter().zip(y.iter()).map(|(p, t)| p - t).collect();
            let mut rows = sample(&mut rng, n, n_rows).into_vec();
            rows.sort_unstable();
            let mut columns = sample(&mut rng, k, n_cols).into_vec();
            columns.sort_unstable();

            let mut builder = TreeBuilder {
                x,
                gradients: &gradients,
                columns: &columns,
                config,
                nodes: Vec::new(),
            };
            builder.grow(&rows, 0);
            let tree = RegressionTree {
                nodes: builder.nodes,
            };
            for (p, row) in prediction.iter_mut().zip(x.rows()) {
                *p += tree.predict_row(row);
            }
            trees.push(tree);
        }

        Ok(Self { base_score, trees })
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect()
    }

    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

fn sample_size(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction).round() as usize).clamp(total.min(1), total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array::from_shape_fn((40, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 7) as f64 });
        let y = x.column(0).mapv(|v| if v < 20.0 { -1.0 } else { 3.0 });
        (x, y)
    }

    fn rmse(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
        ((a - b).mapv(|v| v * v).sum() / a.len() as f64).sqrt()
    }

    #[test]
    fn test_fits_step_function() {
        let (x, y) = step_data();
        let config = GbmConfig {
            n_estimators: 100,
            learning_rate: 0.3,
            subsample: 1.0,
            colsample_bytree: 1.0,
            ..GbmConfig::default()
        };
        let model = GbmRegressor::fit(&x, &y, &config).unwrap();
        assert!((model.base_score() - 1.0).abs() < 1e-12);
        assert!(rmse(&model.predict(&x), &y) < 0.05);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let (x, y) = step_data();
        let config = GbmConfig {
            n_estimators: 20,
            seed: 7,
            ..GbmConfig::default()
        };
        let a = GbmRegressor::fit(&x, &y, &config).unwrap().predict(&x);
        let b = GbmRegressor::fit(&x, &y, &config).unwrap().predict(&x);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_target_never_splits() {
        let (x, _) = step_data();
        let y = Array1::from_elem(x.nrows(), 2.5);
        let model = GbmRegressor::fit(&x, &y, &GbmConfig::default()).unwrap();
        assert!(model.trees().iter().all(|t| t.n_leaves() == 1));
        assert!(model.predict(&x).iter().all(|p| (p - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_zero_columns_predicts_base_score() {
        let x = Array2::zeros((4, 0));
        let y = Array1::from(vec![1.0, 2.0, 3.0, 6.0]);
        let model = GbmRegressor::fit(&x, &y, &GbmConfig::default()).unwrap();
        assert!(model.predict(&x).iter().all(|p| (p - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_rejects_bad_config() {
        let (x, y) = step_data();
        let config = GbmConfig {
            subsample: 0.0,
            ..GbmConfig::default()
        };
        assert!(matches!(GbmRegressor::fit(&x, &y, &config), Err(Error::Config(_))));
    }

    #[test]
    fn test_sample_size() {
        assert_eq!(sample_size(10, 0.8), 8);
        assert_eq!(sample_size(1, 0.1), 1);
        assert_eq!(sample_size(0, 0.8), 0);
    }
}
