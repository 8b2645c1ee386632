use crate::features::Chain;
use std::collections::BTreeMap;

/// One paired heavy/light chain antibody.
///
/// Sequences are kept exactly as read. AHo-aligned strings are optional and
/// only consulted by CDR extraction. A target that is absent or `NaN` is
/// treated as missing for that property.
#[derive(Debug, Clone, PartialEq)]
pub struct AntibodyRecord {
    id: String,
    vh_sequence: String,
    vl_sequence: String,
    vh_aho: Option<String>,
    vl_aho: Option<String>,
    fold: Option<String>,
    targets: BTreeMap<String, f64>,
}

impl AntibodyRecord {
    pub fn new(
        id: impl Into<String>,
        vh_sequence: impl Into<String>,
        vl_sequence: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vh_sequence: vh_sequence.into(),
            vl_sequence: vl_sequence.into(),
            vh_aho: None,
            vl_aho: None,
            fold: None,
            targets: BTreeMap::new(),
        }
    }

    pub fn with_aho(mut self, vh_aho: Option<String>, vl_aho: Option<String>) -> Self {
        self.vh_aho = vh_aho;
        self.vl_aho = vl_aho;
        self
    }

    pub fn with_fold(mut self, fold: Option<String>) -> Self {
        self.fold = fold;
        self
    }

    pub fn with_target(mut self, property: impl Into<String>, value: f64) -> Self {
        self.targets.insert(property.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sequence(&self, chain: Chain) -> &str {
        match chain {
            Chain::Heavy => &self.vh_sequence,
            Chain::Light => &self.vl_sequence,
        }
    }

    /// AHo-aligned sequence of `chain`, if one was supplied.
    pub fn aho(&self, chain: Chain) -> Option<&str> {
        match chain {
            Chain::Heavy => self.vh_aho.as_deref(),
            Chain::Light => self.vl_aho.as_deref(),
        }
    }

    /// The aligned sequence when present, otherwise the raw one.
    pub fn numbered(&self, chain: Chain) -> &str {
        self.aho(chain).unwrap_or_else(|| self.sequence(chain))
    }

    pub fn fold(&self) -> Option<&str> {
        self.fold.as_deref()
    }

    /// Target value for `property`; `None` when absent or `NaN`.
    pub fn target(&self, property: &str) -> Option<f64> {
        self.targets
            .get(property)
            .copied()
            .filter(|v| !v.is_nan())
    }

    /// Whether the column for `property` exists on this record at all, missing
    /// value or not.
    pub fn has_property(&self, property: &str) -> bool {
        self.targets.contains_key(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_targets_treat_nan_as_missing() {
        let rec = AntibodyRecord::new("ab1", "EVQL", "DIQM")
            .with_target("HIC", 2.5)
            .with_target("Tm2", f64::NAN);
        assert_eq!(rec.target("HIC"), Some(2.5));
        assert_eq!(rec.target("Tm2"), None);
        assert_eq!(rec.target("Titer"), None);
        assert!(rec.has_property("Tm2"));
        assert!(!rec.has_property("Titer"));
    }

    #[test]
    fn test_numbered_falls_back_to_raw() {
        let rec = AntibodyRecord::new("ab1", "EVQL", "DIQM")
            .with_aho(Some("EV-QL".to_string()), None);
        assert_eq!(rec.numbered(Chain::Heavy), "EV-QL");
        assert_eq!(rec.numbered(Chain::Light), "DIQM");
        assert_eq!(rec.sequence(Chain::Heavy), "EVQL");
    }
}
