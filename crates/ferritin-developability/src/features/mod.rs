//! Sequence-derived features.
mod assembler;
mod cdr;
pub mod sequence;

pub use assembler::{
    build_matrix, build_matrix_with_schema, global_feature_names, FeatureMatrix, FeatureSchema,
};
pub use cdr::{
    cdr_feature_names, cdr_features, AhoCdrExtractor, CdrExtractor, CdrLoop, CdrRegion, Chain,
};
