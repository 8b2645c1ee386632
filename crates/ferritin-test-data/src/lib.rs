//! ferritin-test-data
//!
//! Small antibody tables embedded in the crate for use in tests.
//!
//! The tables are represented as `TestFile` objects which package the raw bytes
//! and write them to temporary files for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use ferritin_test_data::TestFile;
/// let (train_csv, _temp) = TestFile::antibodies_train_01().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// 12 trastuzumab variants with AHo alignments, three folds in
    /// `hierarchical_cluster_IgG_isotype_stratified_fold`, `HIC` (two rows
    /// missing) and `Tm2`.
    pub fn antibodies_train_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/antibodies/train_01.csv"),
            suffix: "csv",
        }
    }

    /// 4 unlabelled candidates for held-out prediction.
    pub fn antibodies_heldout_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/antibodies/heldout_01.csv"),
            suffix: "csv",
        }
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.filebinary
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_temp_copies_bytes() {
        let file = TestFile::antibodies_train_01();
        let (path, _handle) = file.create_temp().unwrap();
        assert!(path.ends_with(".csv"));
        assert_eq!(fs::read(&path).unwrap(), file.bytes());
    }
}
