//! CDR loop extraction and per-region features.
use super::sequence::{hydrophobicity_index, length, shannon_entropy};
use crate::record::AntibodyRecord;
use std::collections::BTreeMap;
use strum::{Display, EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Chain {
    #[strum(serialize = "vh")]
    Heavy,
    #[strum(serialize = "vl")]
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum CdrLoop {
    #[strum(serialize = "cdr1")]
    Cdr1,
    #[strum(serialize = "cdr2")]
    Cdr2,
    #[strum(serialize = "cdr3")]
    Cdr3,
}

/// The six antigen-binding loops, in feature-column order.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CdrRegion {
    CdrH1, CdrH2, CdrH3,
    CdrL1, CdrL2, CdrL3,
}

impl CdrRegion {
    pub fn new(chain: Chain, cdr: CdrLoop) -> Self {
        match (chain, cdr) {
            (Chain::Heavy, CdrLoop::Cdr1) => Self::CdrH1,
            (Chain::Heavy, CdrLoop::Cdr2) => Self::CdrH2,
            (Chain::Heavy, CdrLoop::Cdr3) => Self::CdrH3,
            (Chain::Light, CdrLoop::Cdr1) => Self::CdrL1,
            (Chain::Light, CdrLoop::Cdr2) => Self::CdrL2,
            (Chain::Light, CdrLoop::Cdr3) => Self::CdrL3,
        }
    }

    pub fn chain(&self) -> Chain {
        match self {
            Self::CdrH1 | Self::CdrH2 | Self::CdrH3 => Chain::Heavy,
            Self::CdrL1 | Self::CdrL2 | Self::CdrL3 => Chain::Light,
        }
    }

    pub fn cdr_loop(&self) -> CdrLoop {
        match self {
            Self::CdrH1 | Self::CdrL1 => CdrLoop::Cdr1,
            Self::CdrH2 | Self::CdrL2 => CdrLoop::Cdr2,
            Self::CdrH3 | Self::CdrL3 => CdrLoop::Cdr3,
        }
    }
}

/// Splits one numbered chain into its CDR loops.
///
/// Loops the extractor cannot locate are simply absent from the map.
pub trait CdrExtractor {
    fn extract_cdrs(&self, numbered: &str) -> BTreeMap<CdrLoop, String>;
}

/// CDR boundaries on AHo-aligned variable domains.
///
/// AHo pads every VH and VL domain to the same 149 columns, so the loops sit
/// at fixed positions for both chains. Anything of another length is not an
/// AHo string and yields no loops.
#[derive(Debug, Clone, Copy, Default)]
pub struct AhoCdrExtractor;

impl AhoCdrExtractor {
    pub const ALIGNED_LENGTH: usize = 149;

    /// 1-based inclusive AHo columns of each loop.
    pub fn bounds(cdr: CdrLoop) -> (usize, usize) {
        match cdr {
            CdrLoop::Cdr1 => (25, 40),
            CdrLoop::Cdr2 => (58, 77),
            CdrLoop::Cdr3 => (109, 137),
        }
    }
}

impl CdrExtractor for AhoCdrExtractor {
    fn extract_cdrs(&self, numbered: &str) -> BTreeMap<CdrLoop, String> {
        let columns: Vec<char> = numbered.chars().collect();
        if columns.len() != Self::ALIGNED_LENGTH {
            log::debug!(
                "sequence of length {} is not AHo aligned; no CDRs extracted",
                columns.len()
            );
            return BTreeMap::new();
        }
        CdrLoop::iter()
            .map(|cdr| {
                let (start, end) = Self::bounds(cdr);
                let residues: String = columns[start - 1..end]
                    .iter()
                    .filter(|&&c| c != '-' && c != '.')
                    .collect();
                (cdr, residues)
            })
            .collect()
    }
}

/// `{region}_len, {region}_hydro, {region}_entropy` for every region.
pub fn cdr_feature_names() -> Vec<String> {
    CdrRegion::iter()
        .flat_map(|region| {
            ["len", "hydro", "entropy"]
                .into_iter()
                .map(move |stat| format!("{region}_{stat}"))
        })
        .collect()
}

pub fn cdr_features(record: &AntibodyRecord, extractor: &dyn CdrExtractor) -> Vec<f64> {
    let heavy = extractor.extract_cdrs(record.numbered(Chain::Heavy));
    let light = extractor.extract_cdrs(record.numbered(Chain::Light));
    let mut features = Vec::with_capacity(CdrRegion::iter().len() * 3);
    for region in CdrRegion::iter() {
        let loops = match region.chain() {
            Chain::Heavy => &heavy,
            Chain::Light => &light,
        };
        let seq = loops.get(&region.cdr_loop()).map_or("", String::as_str);
        features.push(length(seq) as f64);
        features.push(hydrophobicity_index(seq));
        features.push(shannon_entropy(seq));
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aho_with_loops(cdr1: &str, cdr2: &str, cdr3: &str) -> String {
        let mut columns = vec!['G'; AhoCdrExtractor::ALIGNED_LENGTH];
        for (cdr, residues) in [(CdrLoop::Cdr1, cdr1), (CdrLoop::Cdr2, cdr2), (CdrLoop::Cdr3, cdr3)] {
            let (start, end) = AhoCdrExtractor::bounds(cdr);
            for (offset, col) in (start - 1..end).enumerate() {
                columns[col] = residues.chars().nth(offset).unwrap_or('-');
            }
        }
        columns.into_iter().collect()
    }

    #[test]
    fn test_region_names() {
        let names: Vec<String> = CdrRegion::iter().map(|r| r.to_string()).collect();
        assert_eq!(names, ["cdrh1", "cdrh2", "cdrh3", "cdrl1", "cdrl2", "cdrl3"]);
        assert_eq!(CdrRegion::new(Chain::Light, CdrLoop::Cdr2), CdrRegion::CdrL2);
        let names = cdr_feature_names();
        assert_eq!(names.len(), 18);
        assert_eq!(names[0], "cdrh1_len");
        assert_eq!(names[17], "cdrl3_entropy");
    }

    #[test]
    fn test_aho_extraction_strips_gaps() {
        let aligned = aho_with_loops("GFTFSSYA", "ISGSGGST", "AKDRLSITIRPRYYGLDV");
        let cdrs = AhoCdrExtractor.extract_cdrs(&aligned);
        assert_eq!(cdrs[&CdrLoop::Cdr1], "GFTFSSYA");
        assert_eq!(cdrs[&CdrLoop::Cdr2], "ISGSGGST");
        assert_eq!(cdrs[&CdrLoop::Cdr3], "AKDRLSITIRPRYYGLDV");
    }

    #[test]
    fn test_unaligned_input_yields_no_regions() {
        let cdrs = AhoCdrExtractor.extract_cdrs("EVQLVESGGGLVQPGGSLRLSCAAS");
        assert!(cdrs.is_empty());
    }

    #[test]
    fn test_missing_regions_degrade_to_empty() {
        let record = AntibodyRecord::new("ab1", "EVQLVESGG", "DIQMTQSPS");
        let features = cdr_features(&record, &AhoCdrExtractor);
        assert_eq!(features.len(), 18);
        for region in features.chunks(3) {
            assert_eq!(region[0], 0.0);
            assert!(region[1].is_nan());
            assert!(region[2].is_nan());
        }
    }

    #[test]
    fn test_cdr_features_use_aligned_sequence() {
        let heavy = aho_with_loops("IIII", "AAAA", "ACAC");
        let record = AntibodyRecord::new("ab1", "EVQL", "DIQM").with_aho(Some(heavy), None);
        let features = cdr_features(&record, &AhoCdrExtractor);
        // cdrh1
        assert_eq!(features[0], 4.0);
        assert!((features[1] - 4.5).abs() < 1e-12);
        assert!(features[2].abs() < 1e-12);
        // cdrh3
        assert_eq!(features[6], 4.0);
        assert!((features[8] - 1.0).abs() < 1e-12);
        // light chain has no alignment
        assert_eq!(features[9], 0.0);
    }
}
