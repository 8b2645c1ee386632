//! Leave-one-group-out cross-validation over pre-assigned folds.
use crate::error::{Error, Result};
use crate::metrics::spearman;
use crate::models::{HybridConfig, HybridRegressor};
use crate::record::AntibodyRecord;
use itertools::Itertools;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Name of one fold group.
///
/// Integer labels sort numerically and before any non-integer label; the
/// rest sort as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoldLabel(String);

impl FoldLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for FoldLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<i64>(), other.0.parse::<i64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for FoldLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FoldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Partition of records into disjoint fold groups.
///
/// Records without a label belong to no group: they are always part of the
/// training split and never receive an out-of-fold prediction.
#[derive(Debug, Clone)]
pub struct FoldAssignment {
    labels: Vec<FoldLabel>,
    groups: Vec<Option<usize>>,
}

impl FoldAssignment {
    pub fn from_records(records: &[AntibodyRecord]) -> Result<Self> {
        Self::from_labels(records.iter().map(|r| r.fold()))
    }

    /// Blank labels count as unassigned.
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let raw: Vec<Option<FoldLabel>> = labels
            .into_iter()
            .map(|l| {
                l.map(|s| s.as_ref().trim().to_string())
                    .filter(|s| !s.is_empty())
                    .map(FoldLabel)
            })
            .collect();
        let labels: Vec<FoldLabel> = raw.iter().flatten().cloned().sorted().dedup().collect();
        if labels.is_empty() {
            return Err(Error::Config(
                "cross-validation needs fold labels but no record has one".to_string(),
            ));
        }
        let groups = raw
            .iter()
            .map(|l| l.as_ref().and_then(|l| labels.binary_search(l).ok()))
            .collect();
        Ok(Self { labels, groups })
    }

    /// Distinct labels in sorted order.
    pub fn labels(&self) -> &[FoldLabel] {
        &self.labels
    }

    /// Number of records covered, assigned or not.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn label_of(&self, index: usize) -> Option<&FoldLabel> {
        self.groups
            .get(index)
            .copied()
            .flatten()
            .map(|g| &self.labels[g])
    }

    /// Record indices in group number `group`.
    pub fn members(&self, group: usize) -> Vec<usize> {
        self.groups
            .iter()
            .positions(|g| *g == Some(group))
            .collect()
    }
}

/// Metric for one evaluated fold.
#[derive(Debug, Clone, Serialize)]
pub struct FoldScore {
    pub label: FoldLabel,
    /// Records that received a prediction from this fold's model.
    pub indices: Vec<usize>,
    pub spearman: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CvResult {
    pub property: String,
    /// One entry per record; `NaN` where no out-of-fold prediction was made.
    pub oof: Vec<f64>,
    /// Folds with at least two predicted records, in label order.
    pub folds: Vec<FoldScore>,
    pub overall_spearman: f64,
}

impl CvResult {
    pub fn fold_correlations(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.spearman).collect()
    }

    /// Indices with an out-of-fold prediction.
    pub fn evaluated(&self) -> Vec<usize> {
        self.oof.iter().positions(|v| !v.is_nan()).collect()
    }
}

/// Runs leave-one-group-out evaluation with a fresh model per fold.
#[derive(Debug, Clone, Default)]
pub struct CrossValidator {
    config: HybridConfig,
}

impl CrossValidator {
    pub fn new(config: HybridConfig) -> Self {
        Self { config }
    }

    /// `x` holds one feature row per record, in record order.
    pub fn run(
        &self,
        x: &Array2<f64>,
        records: &[AntibodyRecord],
        folds: &FoldAssignment,
        property: &str,
    ) -> Result<CvResult> {
        if x.nrows() != records.len() || folds.len() != records.len() {
            return Err(Error::Data(format!(
                "{} feature rows, {} records and {} fold assignments must agree",
                x.nrows(),
                records.len(),
                folds.len()
            )));
        }
        let targets: Vec<Option<f64>> = records.iter().map(|r| r.target(property)).collect();
        let mut oof = vec![f64::NAN; records.len()];
        let mut scores = Vec::new();

        for (group, label) in folds.labels().iter().enumerate() {
            let (held_out, held_in): (Vec<usize>, Vec<usize>) = (0..records.len())
                .filter(|&i| targets[i].is_some())
                .partition(|&i| folds.groups[i] == Some(group));
            if held_out.is_empty() {
                log::debug!("{property}: fold {label} has no valid targets");
                continue;
            }
            if held_in.is_empty() {
                log::warn!("{property}: fold {label} leaves nothing to train on; skipped");
                continue;
            }

            let y_in: Array1<f64> = held_in.iter().filter_map(|&i| targets[i]).collect();
            let model = HybridRegressor::new(self.config.clone())
                .fit(&x.select(Axis(0), &held_in), &y_in)?;
            let predictions = model.predict(&x.select(Axis(0), &held_out))?;
            for (&i, &p) in held_out.iter().zip(predictions.iter()) {
                oof[i] = p;
            }

            if held_out.len() < 2 {
                log::info!("{property}: fold {label} has a single record; no correlation");
                continue;
            }
            let truth: Vec<f64> = held_out.iter().filter_map(|&i| targets[i]).collect();
            let rho = spearman(&truth, &predictions.to_vec());
            log::info!(
                "{property}: fold {label} spearman {rho:.4} (train {}, test {})",
                held_in.len(),
                held_out.len()
            );
            scores.push(FoldScore {
                label: label.clone(),
                indices: held_out,
                spearman: rho,
            });
        }

        let (truth, pred): (Vec<f64>, Vec<f64>) = targets
            .iter()
            .zip(&oof)
            .filter_map(|(t, &p)| t.filter(|_| !p.is_nan()).map(|t| (t, p)))
            .unzip();
        let overall_spearman = spearman(&truth, &pred);
        log::info!(
            "{property}: overall spearman {overall_spearman:.4} over {} records",
            truth.len()
        );

        Ok(CvResult {
            property: property.to_string(),
            oof,
            folds: scores,
            overall_spearman,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TreeEnsemble;

    #[test]
    fn test_fold_label_ordering() {
        let mut labels: Vec<FoldLabel> = ["10", "2", "b", "a", "-1"].into_iter().map(FoldLabel::new).collect();
        labels.sort();
        let names: Vec<&str> = labels.iter().map(FoldLabel::as_str).collect();
        assert_eq!(names, ["-1", "2", "10", "a", "b"]);
    }

    #[test]
    fn test_fold_assignment() {
        let folds = FoldAssignment::from_labels([Some("1"), None, Some("0"), Some(" "), Some("1")]).unwrap();
        assert_eq!(folds.labels().len(), 2);
        assert_eq!(folds.labels()[0].as_str(), "0");
        assert_eq!(folds.members(1), vec![0, 4]);
        assert_eq!(folds.label_of(2).map(FoldLabel::as_str), Some("0"));
        assert!(folds.label_of(1).is_none());
        assert!(folds.label_of(3).is_none());
    }

    #[test]
    fn test_no_labels_is_config_error() {
        let err = FoldAssignment::from_labels([None::<&str>, None]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unassigned_records_stay_in_training() {
        // six labelled records plus two unlabelled ones
        let records: Vec<AntibodyRecord> = (0..8)
            .map(|i| {
                let fold = match i {
                    0..=2 => Some("0".to_string()),
                    3..=5 => Some("1".to_string()),
                    _ => None,
                };
                AntibodyRecord::new(format!("ab{i}"), "EVQL", "DIQM")
                    .with_fold(fold)
                    .with_target("Tm2", i as f64)
            })
            .collect();
        let x = Array2::from_shape_fn((8, 2), |(i, j)| (i * (j + 1)) as f64);
        let folds = FoldAssignment::from_records(&records).unwrap();
        let config = HybridConfig {
            ensemble: TreeEnsemble::Disabled,
            ..HybridConfig::default()
        };
        let result = CrossValidator::new(config).run(&x, &records, &folds, "Tm2").unwrap();
        assert_eq!(result.evaluated(), vec![0, 1, 2, 3, 4, 5]);
        assert!(result.oof[6].is_nan() && result.oof[7].is_nan());
        assert_eq!(result.folds.len(), 2);
        // x is linear in the target, so ranks are recovered exactly
        assert!((result.overall_spearman - 1.0).abs() < 1e-9);
    }
}
