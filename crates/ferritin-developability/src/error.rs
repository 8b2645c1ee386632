//! Error types for feature assembly, model fitting and cross-validation.
//!
//! Row-level sequence problems (empty chains, unknown residues) are never
//! errors: they surface as `NaN` features and are imputed downstream.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Feature columns disagree between a fitted schema and a later batch.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// The pipeline was asked to do something its inputs cannot support.
    #[error("configuration error: {0}")]
    Config(String),

    /// `transform` was called on a preprocessing chain that was never fit.
    #[error("configuration error: preprocessing chain used before `fit`")]
    NotFitted,

    /// Matrices or targets handed to a fitting routine are unusable.
    #[error("invalid data: {0}")]
    Data(String),

    /// The embedding collaborator rejected every record; `index` is the first.
    #[error("embedding failed for every record, first at {index} ({id})")]
    Embedding {
        index: usize,
        id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_keeps_source() {
        let err = Error::Embedding {
            index: 3,
            id: "mAb-3".to_string(),
            source: anyhow::anyhow!("session closed").into(),
        };
        assert_eq!(err.to_string(), "embedding failed for every record, first at 3 (mAb-3)");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("session closed"));
    }
}
