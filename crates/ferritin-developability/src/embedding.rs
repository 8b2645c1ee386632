use crate::features::sequence::residues;

/// Maps an amino-acid string to a fixed-length vector.
///
/// Implementations load their model once at construction and are passed by
/// reference into feature assembly. `embed` must be deterministic for a given
/// sequence and must return the same length for every input.
pub trait Embedder {
    /// Identifies the model (and version) behind the vectors.
    fn id(&self) -> &str;

    fn embed(&self, sequence: &str) -> anyhow::Result<Vec<f64>>;
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn embed(&self, sequence: &str) -> anyhow::Result<Vec<f64>> {
        (**self).embed(sequence)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn embed(&self, sequence: &str) -> anyhow::Result<Vec<f64>> {
        (**self).embed(sequence)
    }
}

/// Offline embedding: fraction of each standard residue.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositionEmbedder;

impl CompositionEmbedder {
    pub const ID: &'static str = "aa-composition";
    pub const ALPHABET: &'static [u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";
}

impl Embedder for CompositionEmbedder {
    fn id(&self) -> &str {
        Self::ID
    }

    fn embed(&self, sequence: &str) -> anyhow::Result<Vec<f64>> {
        let mut counts = [0usize; 20];
        let mut total = 0usize;
        for aa in residues(sequence) {
            if let Some(idx) = Self::ALPHABET.iter().position(|&a| a == aa) {
                counts[idx] += 1;
            }
            total += 1;
        }
        anyhow::ensure!(total > 0, "cannot embed an empty sequence");
        Ok(counts.iter().map(|&c| c as f64 / total as f64).collect())
    }
}
