use crate::cli::ModelArgs;
use ferritin_developability::{train_and_predict, AhoCdrExtractor};
use ferritin_io::{read_records, write_predictions, ReadOptions};
use std::path::PathBuf;

pub fn execute(
    train_csv: PathBuf,
    heldout_csv: PathBuf,
    out_train_csv: PathBuf,
    out_heldout_csv: PathBuf,
    model: ModelArgs,
) -> anyhow::Result<()> {
    let config = model.pipeline_config(None)?;
    let options = ReadOptions {
        fold_column: None,
        properties: &config.properties,
    };
    let train = read_records(&train_csv, &options)?;
    let heldout = read_records(&heldout_csv, &options)?;
    log::info!("{} training and {} held-out records", train.len(), heldout.len());

    let embedder = model.embedder()?;
    let report = train_and_predict(
        &train,
        &heldout,
        embedder.as_ref(),
        &AhoCdrExtractor,
        &config,
    )?;

    write_predictions(&out_train_csv, &train, None, &report.train)?;
    write_predictions(&out_heldout_csv, &heldout, None, &report.heldout)?;
    Ok(())
}
