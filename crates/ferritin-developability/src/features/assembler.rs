//! Assembly of the per-antibody feature matrix.
//!
//! Columns are laid out once, from the training batch, as global VH and VL
//! summaries, then CDR features, then the embedding block. Later batches are
//! assembled against that [`FeatureSchema`] and never re-derive it.
use super::cdr::{cdr_feature_names, cdr_features, CdrExtractor, Chain};
use super::sequence::{composition_fraction, length, net_charge, residues, AROMATIC, HYDROPHOBIC};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::record::AntibodyRecord;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

const GLOBAL_STATS: [&str; 4] = ["hydrophobic_frac", "aromatic_frac", "net_charge", "length"];

/// Ordered column names of one feature space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
    embedding_dim: usize,
    embedder_id: String,
}

impl FeatureSchema {
    pub fn new(embedding_dim: usize, embedder_id: impl Into<String>) -> Self {
        let mut columns = global_feature_names();
        columns.extend(cdr_feature_names());
        columns.extend((0..embedding_dim).map(|i| format!("emb_{i}")));
        Self {
            columns,
            embedding_dim,
            embedder_id: embedder_id.into(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    /// Fails when `other` names different columns or a different order.
    pub fn check_compatible(&self, other: &FeatureSchema) -> Result<()> {
        if self.columns != other.columns {
            let first_diff = self
                .columns
                .iter()
                .zip(&other.columns)
                .position(|(a, b)| a != b)
                .unwrap_or(self.columns.len().min(other.columns.len()));
            return Err(Error::Schema(format!(
                "expected {} columns, found {} (first difference at column {first_diff})",
                self.columns.len(),
                other.columns.len()
            )));
        }
        if self.embedder_id != other.embedder_id {
            log::warn!(
                "embedder `{}` differs from `{}` used to build the training features",
                other.embedder_id,
                self.embedder_id
            );
        }
        Ok(())
    }
}

/// Feature rows plus the schema they were built against.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub values: Array2<f64>,
    pub schema: FeatureSchema,
}

pub fn global_feature_names() -> Vec<String> {
    Chain::iter()
        .flat_map(|chain| GLOBAL_STATS.iter().map(move |stat| format!("{chain}_{stat}")))
        .collect()
}

fn global_features(record: &AntibodyRecord) -> Vec<f64> {
    Chain::iter()
        .flat_map(|chain| {
            let seq = record.sequence(chain);
            [
                composition_fraction(seq, HYDROPHOBIC),
                composition_fraction(seq, AROMATIC),
                net_charge(seq),
                length(seq) as f64,
            ]
        })
        .collect()
}

/// Builds the training matrix and derives its schema.
///
/// The embedding dimension is taken from the first record that reaches the
/// embedder; every other record must agree with it.
pub fn build_matrix(
    records: &[AntibodyRecord],
    embedder: &dyn Embedder,
    extractor: &dyn CdrExtractor,
) -> Result<FeatureMatrix> {
    let (rows, embedding_dim) = assemble_rows(records, embedder, extractor, None)?;
    let schema = FeatureSchema::new(embedding_dim.unwrap_or(0), embedder.id());
    let values = stack(rows, schema.len())?;
    log::debug!(
        "assembled {} x {} feature matrix ({} embedding dims)",
        values.nrows(),
        values.ncols(),
        schema.embedding_dim()
    );
    Ok(FeatureMatrix { values, schema })
}

/// Builds a matrix for `records` laid out exactly as `schema`.
pub fn build_matrix_with_schema(
    records: &[AntibodyRecord],
    embedder: &dyn Embedder,
    extractor: &dyn CdrExtractor,
    schema: &FeatureSchema,
) -> Result<Array2<f64>> {
    schema.check_compatible(&FeatureSchema::new(schema.embedding_dim(), embedder.id()))?;
    let (rows, _) = assemble_rows(records, embedder, extractor, Some(schema.embedding_dim()))?;
    stack(rows, schema.len())
}

fn assemble_rows(
    records: &[AntibodyRecord],
    embedder: &dyn Embedder,
    extractor: &dyn CdrExtractor,
    expected_dim: Option<usize>,
) -> Result<(Vec<Vec<f64>>, Option<usize>)> {
    let mut embedding_dim = expected_dim;
    let mut pending_nan = Vec::new();
    let mut first_failure: Option<(usize, anyhow::Error)> = None;
    let mut embedded_any = false;
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let mut row = global_features(record);
        row.extend(cdr_features(record, extractor));

        let paired = format!(
            "{}{}",
            record.sequence(Chain::Heavy),
            record.sequence(Chain::Light)
        );
        if residues(&paired).next().is_none() {
            log::debug!("record {index} ({}) has no residues; embedding left missing", record.id());
            pending_nan.push(index);
            rows.push(row);
            continue;
        }

        let embedding = match embedder.embed(&paired) {
            Ok(embedding) => embedding,
            Err(source) => {
                log::warn!(
                    "record {index} ({}) could not be embedded: {source:#}; embedding left missing",
                    record.id()
                );
                first_failure.get_or_insert((index, source));
                pending_nan.push(index);
                rows.push(row);
                continue;
            }
        };
        match embedding_dim {
            Some(dim) if dim != embedding.len() => {
                return Err(Error::Schema(format!(
                    "record {index} ({}) has embedding dimension {}, expected {dim}",
                    record.id(),
                    embedding.len()
                )))
            }
            Some(_) => {}
            None => embedding_dim = Some(embedding.len()),
        }
        embedded_any = true;
        row.extend(embedding);
        rows.push(row);
    }

    // Every embedding attempt failed: the embedder itself is broken.
    if let (false, Some((index, source))) = (embedded_any, first_failure) {
        return Err(Error::Embedding {
            index,
            id: records[index].id().to_string(),
            source: source.into(),
        });
    }

    // Rows without residues only learn the embedding width once a real one is seen.
    let dim = embedding_dim.unwrap_or(0);
    for index in pending_nan {
        rows[index].extend(std::iter::repeat(f64::NAN).take(dim));
    }
    Ok((rows, embedding_dim))
}

fn stack(rows: Vec<Vec<f64>>, ncols: usize) -> Result<Array2<f64>> {
    let nrows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| Error::Schema(format!("feature rows do not match {ncols} columns: {e}")))
}
