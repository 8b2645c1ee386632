use crate::cli::ModelArgs;
use ferritin_developability::{cross_validate, AhoCdrExtractor};
use ferritin_io::{read_records, stage_json, stage_predictions, ReadOptions};
use std::path::PathBuf;

pub fn execute(
    train_csv: PathBuf,
    out_csv: PathBuf,
    report_json: Option<PathBuf>,
    fold_column: String,
    model: ModelArgs,
) -> anyhow::Result<()> {
    let config = model.pipeline_config(Some(fold_column.as_str()))?;
    let options = ReadOptions {
        fold_column: Some(config.fold_column.as_str()),
        properties: &config.properties,
    };
    let records = read_records(&train_csv, &options)?;

    let embedder = model.embedder()?;
    let report = cross_validate(&records, embedder.as_ref(), &AhoCdrExtractor, &config)?;
    for result in &report.results {
        println!(
            "{}\tspearman {:.4}\t(folds: {})",
            result.property,
            result.overall_spearman,
            result
                .fold_correlations()
                .iter()
                .map(|r| format!("{r:.3}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    // Stage every output before any of them lands.
    let oof = stage_predictions(
        &out_csv,
        &records,
        Some(config.fold_column.as_str()),
        &report.predictions(),
    )?;
    let json = report_json
        .map(|path| stage_json(&path, &report))
        .transpose()?;
    oof.commit()?;
    log::info!("wrote {} rows to {}", records.len(), out_csv.display());
    if let Some(json) = json {
        json.commit()?;
    }
    Ok(())
}
