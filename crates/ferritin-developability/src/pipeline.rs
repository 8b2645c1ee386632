//! End-to-end runs: cross-validation on one dataset, or fit on a training
//! set and predict a held-out set.
use crate::cv::{CrossValidator, CvResult, FoldAssignment};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::features::{build_matrix, build_matrix_with_schema, CdrExtractor, FeatureSchema};
use crate::models::{HybridConfig, HybridRegressor};
use crate::record::AntibodyRecord;
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROPERTIES: [&str; 5] = ["HIC", "AC-SINS_pH7.4", "PR_CHO", "Tm2", "Titer"];
pub const DEFAULT_FOLD_COLUMN: &str = "hierarchical_cluster_IgG_isotype_stratified_fold";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub hybrid: HybridConfig,
    /// Column holding fold labels in tabular input.
    pub fold_column: String,
    /// Properties to model, each independently.
    pub properties: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            hybrid: HybridConfig::default(),
            fold_column: DEFAULT_FOLD_COLUMN.to_string(),
            properties: DEFAULT_PROPERTIES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CvReport {
    pub schema: FeatureSchema,
    pub results: Vec<CvResult>,
}

impl CvReport {
    /// Out-of-fold predictions of every evaluated property.
    pub fn predictions(&self) -> Vec<PropertyPredictions> {
        self.results
            .iter()
            .map(|r| PropertyPredictions {
                property: r.property.clone(),
                values: r.oof.clone(),
            })
            .collect()
    }
}

/// Predictions for one property, one value per input record.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyPredictions {
    pub property: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    pub schema: FeatureSchema,
    /// In-sample predictions; `NaN` where the training target is missing.
    pub train: Vec<PropertyPredictions>,
    pub heldout: Vec<PropertyPredictions>,
}

/// Whether `property` has at least one observed value; warns and skips otherwise.
fn evaluable(records: &[AntibodyRecord], property: &str) -> bool {
    if !records.iter().any(|r| r.has_property(property)) {
        log::warn!("property `{property}` not found in input; skipping");
        return false;
    }
    if records.iter().all(|r| r.target(property).is_none()) {
        log::warn!("property `{property}` has no values; skipping");
        return false;
    }
    true
}

/// Cross-validates every configured property over the records' fold labels.
pub fn cross_validate(
    records: &[AntibodyRecord],
    embedder: &dyn Embedder,
    extractor: &dyn CdrExtractor,
    config: &PipelineConfig,
) -> Result<CvReport> {
    let folds = FoldAssignment::from_records(records).inspect_err(|_| {
        log::error!("no values found in fold column `{}`", config.fold_column)
    })?;
    log::info!(
        "cross-validating {} records over {} folds",
        records.len(),
        folds.labels().len()
    );
    let features = build_matrix(records, embedder, extractor)?;
    let validator = CrossValidator::new(config.hybrid.clone());

    let mut results = Vec::new();
    for property in config.properties.iter().filter(|p| evaluable(records, p)) {
        results.push(validator.run(&features.values, records, &folds, property)?);
    }
    Ok(CvReport {
        schema: features.schema,
        results,
    })
}

/// Fits one model per property on `train` and predicts both sets.
pub fn train_and_predict(
    train: &[AntibodyRecord],
    heldout: &[AntibodyRecord],
    embedder: &dyn Embedder,
    extractor: &dyn CdrExtractor,
    config: &PipelineConfig,
) -> Result<PredictionReport> {
    let train_features = build_matrix(train, embedder, extractor)?;
    let heldout_x = build_matrix_with_schema(heldout, embedder, extractor, &train_features.schema)?;
    let regressor = HybridRegressor::new(config.hybrid.clone());

    let mut train_preds = Vec::new();
    let mut heldout_preds = Vec::new();
    for property in config.properties.iter().filter(|p| evaluable(train, p)) {
        let valid: Vec<usize> = (0..train.len())
            .filter(|&i| train[i].target(property).is_some())
            .collect();
        let y: Array1<f64> = valid.iter().filter_map(|&i| train[i].target(property)).collect();
        let model = regressor.fit(&train_features.values.select(Axis(0), &valid), &y)?;

        let mut in_sample = vec![f64::NAN; train.len()];
        let fitted = model.predict(&train_features.values.select(Axis(0), &valid))?;
        for (&i, &p) in valid.iter().zip(fitted.iter()) {
            in_sample[i] = p;
        }
        log::info!("{property}: fit on {} training records", valid.len());

        train_preds.push(PropertyPredictions {
            property: property.clone(),
            values: in_sample,
        });
        heldout_preds.push(PropertyPredictions {
            property: property.clone(),
            values: model.predict(&heldout_x)?.to_vec(),
        });
    }

    Ok(PredictionReport {
        schema: train_features.schema,
        train: train_preds,
        heldout: heldout_preds,
    })
}
