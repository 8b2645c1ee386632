//! Ferritin Onnx Models
//!
//! Protein language model embeddings for developability features. The models
//! are downloaded from HuggingFace and run using ONNX Runtime.
//! Currently supports the ESM2 family.
//!
pub mod models;

pub use models::esm2::{mean_pool, ESM2Models, ESM2};
