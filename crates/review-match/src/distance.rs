//! Edit distance between an extracted token and a candidate name.
//!
//! Both functions compare Unicode scalar values, so Persian or Arabic script
//! names count one edit per character rather than per UTF-8 byte.

use rapidfuzz::distance::levenshtein;

/// Classic Levenshtein distance: the minimum number of single-character
/// insertions, deletions and substitutions turning `a` into `b`.
pub fn edit_distance(a: &str, b: &str) -> usize {
    levenshtein::distance(a.chars(), b.chars())
}

/// Distance scaled into `0.0..=1.0`, where `1.0` means identical.
///
/// Only used for display; ranking is done on [`edit_distance`].
pub fn similarity(a: &str, b: &str) -> f64 {
    levenshtein::normalized_similarity(a.chars(), b.chars())
}
