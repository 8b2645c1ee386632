//! Sequence-level physicochemical summaries.
//!
//! Every function upper-cases its input and drops anything that is not an
//! ASCII letter (alignment gaps, padding, whitespace) before computing. Ratio
//! and index features of an empty filtered sequence are `NaN`; [`length`] is
//! always defined and returns 0 in that case.
//!
//! Non-standard letters (`X`, `B`, `Z`, ...) count toward the length but
//! belong to none of the residue sets and contribute 0 to the hydropathy mean.

/// Hydrophobic side chains used for the global composition feature.
pub const HYDROPHOBIC: &[u8] = b"AILMFVW";
/// Aromatic side chains.
pub const AROMATIC: &[u8] = b"FWY";
/// Residues counted as +1 in [`net_charge`].
pub const BASIC: &[u8] = b"KRH";
/// Residues counted as -1 in [`net_charge`].
pub const ACIDIC: &[u8] = b"DE";

/// Kyte-Doolittle (1982) hydropathy. Unknown residues score 0.
#[rustfmt::skip]
pub fn kyte_doolittle(aa: u8) -> f64 {
    match aa {
        b'A' =>  1.8, b'C' =>  2.5, b'D' => -3.5, b'E' => -3.5,
        b'F' =>  2.8, b'G' => -0.4, b'H' => -3.2, b'I' =>  4.5,
        b'K' => -3.9, b'L' =>  3.8, b'M' =>  1.9, b'N' => -3.5,
        b'P' => -1.6, b'Q' => -3.5, b'R' => -4.5, b'S' => -0.8,
        b'T' => -0.7, b'V' =>  4.2, b'W' => -0.9, b'Y' => -1.3,
        _ => 0.0,
    }
}

/// Upper-cased residues of `seq` with every non-letter removed.
pub fn residues(seq: &str) -> impl Iterator<Item = u8> + '_ {
    seq.bytes()
        .filter(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
}

pub fn length(seq: &str) -> usize {
    residues(seq).count()
}

/// Fraction of residues of `seq` that belong to `residue_set`.
pub fn composition_fraction(seq: &str, residue_set: &[u8]) -> f64 {
    let (hits, total) = residues(seq).fold((0usize, 0usize), |(hits, total), aa| {
        let hit = residue_set.iter().any(|r| r.eq_ignore_ascii_case(&aa));
        (hits + usize::from(hit), total + 1)
    });
    ratio(hits as f64, total)
}

/// (basic - acidic) / length, with basic = {K, R, H} and acidic = {D, E}.
pub fn net_charge(seq: &str) -> f64 {
    let (charge, total) = residues(seq).fold((0i64, 0usize), |(charge, total), aa| {
        let delta = if BASIC.contains(&aa) {
            1
        } else if ACIDIC.contains(&aa) {
            -1
        } else {
            0
        };
        (charge + delta, total + 1)
    });
    ratio(charge as f64, total)
}

/// Mean Kyte-Doolittle hydropathy (GRAVY).
pub fn hydrophobicity_index(seq: &str) -> f64 {
    let (sum, total) = residues(seq).fold((0.0, 0usize), |(sum, total), aa| {
        (sum + kyte_doolittle(aa), total + 1)
    });
    ratio(sum, total)
}

/// Shannon entropy (bits) of the residue frequency distribution.
pub fn shannon_entropy(seq: &str) -> f64 {
    let mut counts = [0usize; 26];
    let mut total = 0usize;
    for aa in residues(seq) {
        counts[usize::from(aa - b'A')] += 1;
        total += 1;
    }
    if total == 0 {
        return f64::NAN;
    }
    let n = total as f64;
    -counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            p * p.log2()
        })
        .sum::<f64>()
}

fn ratio(numerator: f64, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        numerator / total as f64
    }
}
