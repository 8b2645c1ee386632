use crate::{ID_COLUMN, VH_AHO_COLUMN, VH_COLUMN, VL_AHO_COLUMN, VL_COLUMN};
use anyhow::{anyhow, bail, Context, Result};
use ferritin_developability::AntibodyRecord;
use polars::prelude::*;
use std::path::Path;

/// Which optional columns to pull out of the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions<'a> {
    /// Fold-label column. When set, the column must exist.
    pub fold_column: Option<&'a str>,
    /// Target properties; those missing from the table are left off the records.
    pub properties: &'a [String],
}

pub fn read_records(path: impl AsRef<Path>, options: &ReadOptions) -> Result<Vec<AntibodyRecord>> {
    let path = path.as_ref();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("failed to read {}", path.display()))?;
    log::debug!("read {} rows x {} columns from {}", df.height(), df.width(), path.display());
    records_from_frame(&df, options).with_context(|| format!("invalid table {}", path.display()))
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Text values of `name`; nulls become `None`.
fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn optional_text(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if has_column(df, name) {
        text_column(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

pub fn records_from_frame(df: &DataFrame, options: &ReadOptions) -> Result<Vec<AntibodyRecord>> {
    let missing: Vec<&str> = [ID_COLUMN, VH_COLUMN, VL_COLUMN]
        .into_iter()
        .filter(|c| !has_column(df, c))
        .collect();
    if !missing.is_empty() {
        bail!("missing required column(s): {}", missing.join(", "));
    }
    if let Some(fold) = options.fold_column {
        if !has_column(df, fold) {
            bail!("fold column `{fold}` not found");
        }
    }

    let ids = text_column(df, ID_COLUMN)?;
    let vh = text_column(df, VH_COLUMN)?;
    let vl = text_column(df, VL_COLUMN)?;
    let vh_aho = optional_text(df, VH_AHO_COLUMN)?;
    let vl_aho = optional_text(df, VL_AHO_COLUMN)?;
    let folds = match options.fold_column {
        Some(name) => text_column(df, name)?,
        None => vec![None; df.height()],
    };
    let targets = options
        .properties
        .iter()
        .filter(|p| has_column(df, p))
        .map(|p| float_column(df, p).map(|values| (p.as_str(), values)))
        .collect::<Result<Vec<_>>>()?;

    (0..df.height())
        .map(|row| {
            let id = ids[row]
                .clone()
                .ok_or_else(|| anyhow!("row {row} has no {ID_COLUMN}"))?;
            let mut record = AntibodyRecord::new(
                id,
                vh[row].clone().unwrap_or_default(),
                vl[row].clone().unwrap_or_default(),
            )
            .with_aho(vh_aho[row].clone(), vl_aho[row].clone())
            .with_fold(folds[row].clone());
            for (property, values) in &targets {
                record = record.with_target(*property, values[row]);
            }
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferritin_developability::Chain;

    fn frame() -> DataFrame {
        df!(
            ID_COLUMN => ["ab1", "ab2", "ab3"],
            VH_COLUMN => [Some("EVQL"), None, Some("QVQL")],
            VL_COLUMN => ["DIQM", "EIVL", "DIVM"],
            "fold" => [0i64, 1, 1],
            "HIC" => [Some(2.5), None, Some(3.1)],
        )
        .unwrap()
    }

    #[test]
    fn test_records_from_frame() {
        let properties = vec!["HIC".to_string(), "Titer".to_string()];
        let options = ReadOptions {
            fold_column: Some("fold"),
            properties: &properties,
        };
        let records = records_from_frame(&frame(), &options).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id(), "ab1");
        assert_eq!(records[1].sequence(Chain::Heavy), "");
        assert_eq!(records[2].fold(), Some("1"));
        assert_eq!(records[0].target("HIC"), Some(2.5));
        assert_eq!(records[1].target("HIC"), None);
        assert!(records[1].has_property("HIC"));
        assert!(!records[0].has_property("Titer"));
        assert_eq!(records[0].aho(Chain::Heavy), None);
    }

    #[test]
    fn test_missing_required_column() {
        let df = frame().drop(VL_COLUMN).unwrap();
        let err = records_from_frame(&df, &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().contains(VL_COLUMN));
    }

    #[test]
    fn test_missing_fold_column() {
        let options = ReadOptions {
            fold_column: Some("cluster"),
            properties: &[],
        };
        let err = records_from_frame(&frame(), &options).unwrap_err();
        assert!(err.to_string().contains("cluster"));
    }
}
