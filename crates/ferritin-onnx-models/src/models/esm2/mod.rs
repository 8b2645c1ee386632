//! ESM2 embeddings. Models converted to ONNX format from [ESM2](https://github.com/facebookresearch/esm)
//! and uploaded to HuggingFace hub together with their `tokenizer.json`.
//!
//! # Models:
//! * ESM2_T6_8M - small 6-layer protein language model
//! * ESM2_T12_35M - medium 12-layer protein language model
//! * ESM2_T30_150M - large 30-layer protein language model
//!
use anyhow::{anyhow, ensure, Context, Result};
use ferritin_developability::Embedder;
use hf_hub::api::sync::Api;
use ndarray::{ArrayView2, Axis, Ix3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use tokenizers::Tokenizer;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ESM2Models {
    ESM2_T6_8M,
    ESM2_T12_35M,
    ESM2_T30_150M,
}

impl ESM2Models {
    pub fn repo_id(&self) -> &'static str {
        match self {
            ESM2Models::ESM2_T6_8M => "zcpbx/esm2-t6-8m-UR50D-onnx",
            ESM2Models::ESM2_T12_35M => "zcpbx/esm2-t12-35M-UR50D-onnx",
            ESM2Models::ESM2_T30_150M => "zcpbx/esm2-t30-150M-UR50D-onnx",
        }
    }
}

/// A loaded ESM2 session. Construct once and share by reference.
pub struct ESM2 {
    model: ESM2Models,
    session: Session,
    tokenizer: Tokenizer,
}

impl ESM2 {
    /// Downloads (or reuses the cached) model and tokenizer and builds the session.
    pub fn new(model: ESM2Models) -> Result<Self> {
        let api = Api::new()?;
        let repo = api.model(model.repo_id().to_string());
        let model_path = repo
            .get("model.onnx")
            .with_context(|| format!("failed to fetch model.onnx from {}", model.repo_id()))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .with_context(|| format!("failed to fetch tokenizer.json from {}", model.repo_id()))?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        ort::init().with_name("ESM2").commit()?;
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)?
            .with_intra_threads(1)?
            .commit_from_file(&model_path)?;
        log::info!("loaded {} from {}", model.repo_id(), model_path.display());

        Ok(Self {
            model,
            session,
            tokenizer,
        })
    }

    pub fn model(&self) -> ESM2Models {
        self.model
    }

    /// Mean of the final hidden state over residue tokens.
    pub fn run_model(&self, sequence: &str) -> Result<Vec<f64>> {
        let tokens = self
            .tokenizer
            .encode(sequence, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        // since we are taking a single string we set the first <batch> dimension == 1.
        let shape = (1, tokens.len());
        let ids = ndarray::Array2::from_shape_vec(
            shape,
            tokens.get_ids().iter().map(|&x| x as i64).collect(),
        )?;
        let mask = ndarray::Array2::from_shape_vec(
            shape,
            tokens.get_attention_mask().iter().map(|&x| x as i64).collect(),
        )?;

        let wants_mask = self.session.inputs.iter().any(|i| i.name == "attention_mask");
        let outputs = if wants_mask {
            self.session
                .run(ort::inputs!["input_ids" => ids, "attention_mask" => mask]?)?
        } else {
            self.session.run(ort::inputs!["input_ids" => ids]?)?
        };

        let hidden = match outputs.get("last_hidden_state") {
            Some(value) => value.view(),
            None => {
                let (name, value) = outputs
                    .iter()
                    .next()
                    .ok_or_else(|| anyhow!("model produced no outputs"))?;
                log::warn!("no `last_hidden_state` output; pooling `{name}` instead");
                value
            }
        };
        //  <Batch> <SeqLength> <Hidden>
        let hidden = hidden.try_extract_tensor::<f32>()?.into_dimensionality::<Ix3>()?;
        mean_pool(hidden.index_axis(Axis(0), 0), tokens.get_special_tokens_mask())
    }
}

impl Embedder for ESM2 {
    fn id(&self) -> &str {
        self.model.repo_id()
    }

    fn embed(&self, sequence: &str) -> Result<Vec<f64>> {
        self.run_model(sequence)
    }
}

/// Averages the rows of `hidden` whose `special_mask` entry is 0.
pub fn mean_pool(hidden: ArrayView2<f32>, special_mask: &[u32]) -> Result<Vec<f64>> {
    ensure!(
        hidden.nrows() == special_mask.len(),
        "{} hidden states for {} tokens",
        hidden.nrows(),
        special_mask.len()
    );
    let residues: Vec<usize> = special_mask
        .iter()
        .enumerate()
        .filter(|&(_, &special)| special == 0)
        .map(|(i, _)| i)
        .collect();
    ensure!(!residues.is_empty(), "no residue tokens to pool");
    let n = residues.len() as f64;
    Ok((0..hidden.ncols())
        .map(|j| residues.iter().map(|&i| f64::from(hidden[[i, j]])).sum::<f64>() / n)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mean_pool_skips_special_tokens() -> Result<()> {
        let hidden = array![[100.0f32, 100.0], [1.0, 2.0], [3.0, 6.0], [-50.0, -50.0]];
        let pooled = mean_pool(hidden.view(), &[1, 0, 0, 1])?;
        assert_eq!(pooled, vec![2.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_mean_pool_rejects_bad_masks() {
        let hidden = array![[1.0f32], [2.0]];
        assert!(mean_pool(hidden.view(), &[0]).is_err());
        assert!(mean_pool(hidden.view(), &[1, 1]).is_err());
    }

    #[test]
    fn test_repo_ids() {
        assert_eq!(ESM2Models::ESM2_T6_8M.repo_id(), "zcpbx/esm2-t6-8m-UR50D-onnx");
    }

    #[test]
    #[ignore = "downloads the ESM2 model from the HuggingFace hub"]
    fn test_esm2_embedding_dimension() -> Result<()> {
        let esm2 = ESM2::new(ESM2Models::ESM2_T6_8M)?;
        let a = esm2.embed("EVQLVESGGGLVQPGGSLRLSCAAS")?;
        let b = esm2.embed("DIQMTQSPSSLSASVGDRVTITC")?;
        assert_eq!(a.len(), b.len());
        assert_eq!(esm2.id(), "zcpbx/esm2-t6-8m-UR50D-onnx");
        Ok(())
    }
}
