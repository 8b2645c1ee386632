//! ferritin-io
//!
//! CSV input and output for antibody screening tables.
//!
//! Input rows carry an `antibody_name`, paired `vh_protein_sequence` and
//! `vl_protein_sequence`, optional AHo-aligned chains, an optional fold label
//! and any number of measured properties. Output tables repeat the identifier
//! and sequence columns followed by one prediction column per property.
mod reader;
mod writer;

pub use reader::{read_records, records_from_frame, ReadOptions};
pub use writer::{
    predictions_frame, stage_json, stage_predictions, write_predictions, StagedFile,
};

pub const ID_COLUMN: &str = "antibody_name";
pub const VH_COLUMN: &str = "vh_protein_sequence";
pub const VL_COLUMN: &str = "vl_protein_sequence";
pub const VH_AHO_COLUMN: &str = "heavy_aligned_aho";
pub const VL_AHO_COLUMN: &str = "light_aligned_aho";
