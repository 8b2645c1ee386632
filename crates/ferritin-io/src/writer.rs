use crate::{ID_COLUMN, VH_COLUMN, VL_COLUMN};
use anyhow::{ensure, Context, Result};
use ferritin_developability::{AntibodyRecord, Chain, PropertyPredictions};
use polars::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Identifier and sequence columns, the fold column when given, then one
/// column per property. Missing predictions become nulls.
pub fn predictions_frame(
    records: &[AntibodyRecord],
    fold_column: Option<&str>,
    predictions: &[PropertyPredictions],
) -> Result<DataFrame> {
    let text = |name: &str, values: Vec<Option<&str>>| -> Column {
        Series::new(name.into(), values).into()
    };
    let mut columns = vec![
        text(ID_COLUMN, records.iter().map(|r| Some(r.id())).collect()),
        text(VH_COLUMN, records.iter().map(|r| Some(r.sequence(Chain::Heavy))).collect()),
        text(VL_COLUMN, records.iter().map(|r| Some(r.sequence(Chain::Light))).collect()),
    ];
    if let Some(name) = fold_column {
        columns.push(text(name, records.iter().map(|r| r.fold()).collect()));
    }
    for prediction in predictions {
        ensure!(
            prediction.values.len() == records.len(),
            "{} has {} predictions for {} records",
            prediction.property,
            prediction.values.len(),
            records.len()
        );
        let values: Vec<Option<f64>> = prediction
            .values
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect();
        columns.push(Series::new(prediction.property.as_str().into(), values).into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Output fully written to a temp file next to its destination.
///
/// Nothing appears at the destination until [`StagedFile::commit`]; dropping
/// the value removes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    fn new(path: &Path, write: impl FnOnce(&mut std::fs::File) -> Result<()>) -> Result<Self> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        write(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;
        Ok(Self {
            tmp,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the temp file into place.
    pub fn commit(self) -> Result<()> {
        self.tmp
            .persist(&self.path)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

pub fn stage_predictions(
    path: impl AsRef<Path>,
    records: &[AntibodyRecord],
    fold_column: Option<&str>,
    predictions: &[PropertyPredictions],
) -> Result<StagedFile> {
    let path = path.as_ref();
    let mut df = predictions_frame(records, fold_column, predictions)?;
    let staged = StagedFile::new(path, |file| {
        CsvWriter::new(file).include_header(true).finish(&mut df)?;
        Ok(())
    })?;
    log::debug!("staged {} rows for {}", df.height(), path.display());
    Ok(staged)
}

pub fn stage_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<StagedFile> {
    StagedFile::new(path.as_ref(), |file| {
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    })
}

pub fn write_predictions(
    path: impl AsRef<Path>,
    records: &[AntibodyRecord],
    fold_column: Option<&str>,
    predictions: &[PropertyPredictions],
) -> Result<()> {
    let path = path.as_ref();
    stage_predictions(path, records, fold_column, predictions)?.commit()?;
    log::info!("wrote {} rows to {}", records.len(), path.display());
    Ok(())
}
