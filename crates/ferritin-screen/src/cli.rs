use super::commands;
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ferritin_developability::pipeline::{DEFAULT_FOLD_COLUMN, DEFAULT_PROPERTIES};
use ferritin_developability::{CompositionEmbedder, Embedder, HybridConfig, PipelineConfig, TreeEnsemble};
use ferritin_onnx_models::{ESM2Models, ESM2};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit on a training table and predict a held-out table
    Predict {
        #[arg(long)]
        train_csv: PathBuf,
        #[arg(long)]
        heldout_csv: PathBuf,
        /// In-sample predictions for the training rows
        #[arg(long)]
        out_train_csv: PathBuf,
        #[arg(long)]
        out_heldout_csv: PathBuf,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Leave-one-fold-out cross-validation on a labelled table
    Cv {
        #[arg(long)]
        train_csv: PathBuf,
        /// Out-of-fold predictions
        #[arg(long)]
        out_csv: PathBuf,
        /// Per-fold and overall Spearman as JSON
        #[arg(long)]
        report_json: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_FOLD_COLUMN)]
        fold_column: String,
        #[command(flatten)]
        model: ModelArgs,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum EmbedderKind {
    /// Amino-acid composition; no model download
    Composition,
    #[value(name = "esm2-t6-8m")]
    Esm2T6,
    #[value(name = "esm2-t12-35m")]
    Esm2T12,
    #[value(name = "esm2-t30-150m")]
    Esm2T30,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    #[arg(long, value_enum, default_value = "esm2-t12-35m")]
    pub embedder: EmbedderKind,

    /// Property column to model; repeat for several (default: HIC, AC-SINS_pH7.4, PR_CHO, Tm2, Titer)
    #[arg(long = "property")]
    pub properties: Vec<String>,

    /// JSON file with model settings; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub n_components: Option<usize>,

    /// Use the ridge model alone
    #[arg(long)]
    pub no_ensemble: bool,

    #[arg(long)]
    pub seed: Option<u64>,
}

impl ModelArgs {
    pub fn pipeline_config(&self, fold_column: Option<&str>) -> anyhow::Result<PipelineConfig> {
        let mut hybrid: HybridConfig = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid model config {}", path.display()))?
            }
            None => HybridConfig::default(),
        };
        if let Some(n) = self.n_components {
            hybrid.preprocess.n_components = n;
        }
        if self.no_ensemble {
            hybrid.ensemble = TreeEnsemble::Disabled;
        }
        if let (Some(seed), TreeEnsemble::Enabled(gbm)) = (self.seed, &mut hybrid.ensemble) {
            gbm.seed = seed;
        }

        let properties = if self.properties.is_empty() {
            DEFAULT_PROPERTIES.iter().map(|p| p.to_string()).collect()
        } else {
            self.properties.clone()
        };
        Ok(PipelineConfig {
            hybrid,
            fold_column: fold_column.unwrap_or(DEFAULT_FOLD_COLUMN).to_string(),
            properties,
        })
    }

    /// Loads the embedding model once for the whole run.
    pub fn embedder(&self) -> anyhow::Result<Box<dyn Embedder>> {
        let model = match self.embedder {
            EmbedderKind::Composition => return Ok(Box::new(CompositionEmbedder)),
            EmbedderKind::Esm2T6 => ESM2Models::ESM2_T6_8M,
            EmbedderKind::Esm2T12 => ESM2Models::ESM2_T12_35M,
            EmbedderKind::Esm2T30 => ESM2Models::ESM2_T30_150M,
        };
        Ok(Box::new(ESM2::new(model)?))
    }
}

impl Cli {
    pub fn init_logging(&self) {
        let level = if self.verbose { "debug" } else { "info" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }

    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Predict {
                train_csv,
                heldout_csv,
                out_train_csv,
                out_heldout_csv,
                model,
            } => commands::predict::execute(
                train_csv,
                heldout_csv,
                out_train_csv,
                out_heldout_csv,
                model,
            ),
            Commands::Cv {
                train_csv,
                out_csv,
                report_json,
                fold_column,
                model,
            } => commands::cross_validate::execute(train_csv, out_csv, report_json, fold_column, model),
        }
    }
}
